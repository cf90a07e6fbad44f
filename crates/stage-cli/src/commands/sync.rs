//! `archive` and `prepare` command implementations

use colored::Colorize;
use stage_core::{SyncConfig, SyncEngine, SyncKind, SyncReport};
use stage_fs::ConfigStore;

use crate::cli::SyncArgs;
use crate::error::Result;

/// Build the run configuration for `kind` from a config file and flags.
///
/// Values from `--config` are loaded first; any flag given on the command
/// line replaces the loaded value.
pub fn build_config(kind: SyncKind, args: &SyncArgs) -> Result<SyncConfig> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration");
            ConfigStore::new().load::<SyncConfig>(path)?
        }
        None => SyncConfig::default(),
    };
    config.kind = kind;

    if let Some(input) = &args.input {
        config.input = Some(input.clone());
    }
    if !args.outputs.is_empty() {
        config.outputs = args.outputs.clone();
    }
    if let Some(name) = &args.name {
        config.name = Some(name.clone());
    }
    if let Some(lines) = args.lines {
        config.lines = lines;
    }
    if let Some(bytes) = args.bytes {
        config.bytes = Some(bytes);
    }
    if let Some(program) = &args.split_program {
        config.split_program = program.clone();
    }
    if let Some(dir) = &args.state_dir {
        config.state_dir = Some(dir.clone());
    }

    config.ordered |= args.ordered;
    config.metadata |= args.metadata;
    config.split |= args.split;
    config.dry_run |= args.dry_run;
    config.restart |= args.restart;
    if args.no_clean {
        config.clean = false;
    }

    Ok(config)
}

/// Run one sync; returns whether every examined file was handled.
pub fn run_sync(kind: SyncKind, args: &SyncArgs) -> Result<bool> {
    let config = build_config(kind, args)?;
    let report = SyncEngine::new(config).run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(report.success())
}

/// Print a human-readable run summary
pub(crate) fn print_report(report: &SyncReport) {
    let label = match &report.name {
        Some(name) => format!("{} ({})", report.kind, name),
        None => report.kind.to_string(),
    };
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    let counts = report.counts;
    let status = if report.failed() {
        "FAILED".red().bold()
    } else {
        "OK".green().bold()
    };

    println!(
        "{} {}{} examined={} new={} changed={} processed={} ignored={} error={} ({} ms)",
        status,
        prefix,
        label.cyan(),
        counts.examined,
        counts.new,
        counts.changed,
        counts.processed,
        counts.ignored,
        counts.error,
        report.duration_ms
    );
    for path in &report.published {
        println!("   {} {}", "+".green(), path.display());
    }
}
