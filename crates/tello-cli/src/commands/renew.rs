//! `renew` command: one full scheduler-tick invocation.

use std::path::Path;

use anyhow::Result;
use tello_core::clock::SystemClock;
use tello_core::runner::Renewer;
use tello_core::state::LockError;
use tracing::error;

use super::client::CommandClient;

/// Run the renewal flow and return the process exit code.
///
/// 0 = skipped or attempt succeeded, 1 = attempt failed, 2 = another
/// invocation holds the state lock. A missing `[client] command` only
/// fails invocations that actually need the client; skip days still exit
/// successfully.
pub fn run(config_path: &Path, dry_run: bool, force: bool, format: &str) -> Result<u8> {
    let (config, timezone) = super::load_config(config_path)?;
    let engine = super::build_engine(&config, timezone, force);
    let client = CommandClient::new(&config.client.command);
    let clock = SystemClock;

    let report = match Renewer::new(&engine, &client, &clock).run(dry_run) {
        Ok(report) => report,
        Err(err @ LockError::AlreadyRunning { .. }) => {
            error!("{err}");
            return Ok(2);
        },
        Err(err) => return Err(err.into()),
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("decision:  {}", report.decision);
        if let Some(due_date) = report.due_date {
            println!("due date:  {due_date}");
        }
        if report.renewed {
            println!("outcome:   renewed");
        } else if report.attempted {
            println!(
                "outcome:   {}",
                if report.success { "checked" } else { "failed" }
            );
        } else {
            println!("outcome:   skipped");
        }
        if let Some(error) = &report.error {
            eprintln!("error:     {error}");
        }
    }

    Ok(u8::from(!report.success))
}
