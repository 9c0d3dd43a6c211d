//! `status` command: read-only view of cached state.

use std::path::Path;

use anyhow::Result;
use tello_core::clock::{Clock, SystemClock};

/// Print cached records and the decision that would be taken right now.
///
/// Takes no lock and writes nothing: the record writers are atomic renames,
/// so a read-only view cannot observe a torn record.
pub fn run(config_path: &Path) -> Result<()> {
    let (config, timezone) = super::load_config(config_path)?;
    let engine = super::build_engine(&config, timezone, false);
    let now = SystemClock.now_utc();

    println!(
        "state folder:    {}",
        config.renewal.state_folder_path.display()
    );
    println!("timezone:        {timezone}");
    println!(
        "renewal window:  {} days before due date",
        config.renewal.days_before_renewal
    );

    match engine.cached_due_date() {
        Some(due_date) => {
            let today = now.with_timezone(&timezone).date_naive();
            let days_until_due = (due_date - today).num_days();
            println!("cached due date: {due_date} ({days_until_due} days until due)");
        },
        None => println!("cached due date: none (never observed)"),
    }

    match engine.last_run() {
        Some(record) => println!(
            "last attempt:    {} success={} dryRun={}",
            record.timestamp.to_rfc3339(),
            record.success,
            record.dry_run
        ),
        None => println!("last attempt:    none"),
    }

    println!("decision now:    {}", engine.decide(now));
    Ok(())
}
