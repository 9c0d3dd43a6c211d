//! tello-renewal - Tello plan auto-renewal CLI.
//!
//! Thin shell over `tello-core`: argument parsing, logging setup, and exit
//! codes. Intended to be run once per scheduler tick.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;

/// tello-renewal - decide and perform Tello plan renewals
#[derive(Parser, Debug)]
#[command(name = "tello-renewal")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the renewal configuration file
    #[arg(short, long, default_value = "tello.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decide whether a renewal is due and, when it is, perform it
    Renew {
        /// Observe only; never submit the real renewal form
        #[arg(long)]
        dry_run: bool,

        /// Bypass all skip logic for this invocation
        #[arg(long)]
        force: bool,

        /// Output format (`text` or `json`)
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Show cached state and the decision that would be taken now
    Status,

    /// Cache management
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Remove the cached due date and last run record
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Renew {
            dry_run,
            force,
            format,
        } => {
            // Renewal uses specific exit codes: 0=skipped or renewed,
            // 1=attempt failed, 2=another invocation holds the lock.
            let exit_code = commands::renew::run(&cli.config, dry_run, force, &format)?;
            std::process::exit(i32::from(exit_code));
        },
        Commands::Status => commands::status::run(&cli.config),
        Commands::Cache(CacheCommands::Clear) => commands::cache::clear(&cli.config),
    }
}
