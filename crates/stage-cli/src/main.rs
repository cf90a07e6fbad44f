//! stagesync CLI
//!
//! Publishes files from a staging directory once they have finished
//! arriving.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;
use stage_core::SyncKind;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Run the parsed command; `Ok(false)` means some file failed.
fn run() -> Result<bool> {
    let cli = Cli::parse();

    logging::init(cli.verbose)?;
    tracing::debug!("Verbose mode enabled");

    match cli.command {
        Commands::Archive(args) => commands::run_sync(SyncKind::Archive, &args),
        Commands::Prepare(args) => commands::run_sync(SyncKind::Prepare, &args),
        Commands::SyncAll {
            kind,
            config,
            only,
            except,
            dry_run,
            json,
        } => commands::run_sync_all(kind.into(), &config, &only, &except, dry_run, json),
    }
}
