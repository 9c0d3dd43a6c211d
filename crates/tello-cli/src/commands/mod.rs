//! CLI command implementations.

pub mod cache;
pub mod client;
pub mod renew;
pub mod status;

use std::path::Path;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use tello_core::config::RenewalConfig;
use tello_core::engine::RenewalEngine;

/// Load and validate the configuration file.
fn load_config(config_path: &Path) -> Result<(RenewalConfig, Tz)> {
    let config = RenewalConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let timezone = config.timezone().context("invalid timezone")?;
    Ok((config, timezone))
}

/// Build the engine from a loaded configuration.
fn build_engine(config: &RenewalConfig, timezone: Tz, force: bool) -> RenewalEngine {
    RenewalEngine::new(
        &config.renewal.state_folder_path,
        timezone,
        config.renewal.days_before_renewal,
        force,
    )
}
