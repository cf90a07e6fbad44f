//! `sync-all` command implementation

use std::path::Path;

use colored::Colorize;
use serde_json::json;
use stage_core::{ListenerFilter, SyncAll, SyncAllConfig, SyncKind};
use stage_fs::ConfigStore;

use super::sync::print_report;
use crate::error::Result;

/// Run every selected listener; returns whether all of them succeeded.
pub fn run_sync_all(
    kind: SyncKind,
    config_path: &Path,
    only: &[String],
    except: &[String],
    dry_run: bool,
    json: bool,
) -> Result<bool> {
    let mut config: SyncAllConfig = ConfigStore::new().load(config_path)?;
    config.defaults.dry_run |= dry_run;

    let filter = ListenerFilter {
        only: (!only.is_empty()).then(|| only.to_vec()),
        except: except.to_vec(),
    };

    let outcomes = SyncAll::new(kind, config, filter).run()?;
    let succeeded = outcomes.iter().all(|o| o.succeeded());

    if json {
        let listeners: Vec<_> = outcomes
            .iter()
            .map(|o| match &o.result {
                Ok(report) => json!({ "name": o.name, "report": report }),
                Err(e) => json!({ "name": o.name, "error": e.to_string() }),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "kind": kind, "listeners": listeners }))?
        );
        return Ok(succeeded);
    }

    if outcomes.is_empty() {
        println!("{} No listeners selected", "=>".blue().bold());
    }
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => print_report(report),
            Err(e) => println!("{} {}: {}", "FAILED".red().bold(), outcome.name.cyan(), e),
        }
    }

    Ok(succeeded)
}
