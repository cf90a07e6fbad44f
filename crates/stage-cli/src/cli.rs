//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use stage_core::SyncKind;

/// stagesync - Publish files from a staging directory once they stop growing
#[derive(Parser, Debug)]
#[command(name = "stagesync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Hard link (or split) stable files into a single archive directory
    ///
    /// Examples:
    ///   stagesync archive --input /var/inbound --output /data/archive
    ///   stagesync archive --input /var/inbound --output /data/archive --split --lines 100000
    Archive(SyncArgs),

    /// Publish stable files round robin into one or more output directories
    ///
    /// Examples:
    ///   stagesync prepare --input /var/inbound --output /data/a,/data/b --ordered
    ///   stagesync prepare --config prepare.toml --dry-run
    Prepare(SyncArgs),

    /// Run a sync for every listener in a configuration file
    ///
    /// Each listener `<name>` syncs `<input>/<name>` into `<output>/<name>`.
    SyncAll {
        /// Kind of sync to run for each listener
        #[arg(value_enum)]
        kind: KindArg,

        /// Configuration file with defaults and `[listeners.<name>]` tables
        #[arg(long)]
        config: PathBuf,

        /// Only run these listeners
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Never run these listeners
        #[arg(long, value_delimiter = ',')]
        except: Vec<String>,

        /// Classify and log without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

/// Sync kind as a command-line value
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Archive,
    Prepare,
}

impl From<KindArg> for SyncKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Archive => SyncKind::Archive,
            KindArg::Prepare => SyncKind::Prepare,
        }
    }
}

/// Options shared by the `archive` and `prepare` commands
///
/// Flags override values loaded from `--config`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncArgs {
    /// Directory of (possibly growing) files
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directories, comma-separated or repeated
    #[arg(short, long = "output", value_delimiter = ',')]
    pub outputs: Vec<PathBuf>,

    /// Instance name; scopes the state and lock files
    #[arg(long)]
    pub name: Option<String>,

    /// Publish under time- and counter-ordered names
    #[arg(long)]
    pub ordered: bool,

    /// Write a checksummed sidecar for every artifact (implies --ordered)
    #[arg(long)]
    pub metadata: bool,

    /// Split each file into numbered chunks
    #[arg(long)]
    pub split: bool,

    /// Lines per chunk
    #[arg(long)]
    pub lines: Option<u64>,

    /// Bytes per chunk; wins over --lines
    #[arg(long)]
    pub bytes: Option<u64>,

    /// Path to the split program
    #[arg(long)]
    pub split_program: Option<String>,

    /// Keep carriage returns when splitting
    #[arg(long)]
    pub no_clean: bool,

    /// Directory for state and lock files (default: system temp dir)
    #[arg(long, env = "STAGESYNC_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Classify and log without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Ignore previously recorded state
    #[arg(long)]
    pub restart: bool,

    /// Output the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Load settings from a TOML, JSON or YAML file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
