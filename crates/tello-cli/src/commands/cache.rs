//! `cache` commands: explicit invalidation.

use std::path::Path;

use anyhow::{Context, Result};

/// Remove both cached records from the state folder.
pub fn clear(config_path: &Path) -> Result<()> {
    let (config, timezone) = super::load_config(config_path)?;
    let engine = super::build_engine(&config, timezone, false);
    engine
        .clear_cache()
        .context("failed to clear cached state")?;
    println!(
        "cache cleared in {}",
        config.renewal.state_folder_path.display()
    );
    Ok(())
}
