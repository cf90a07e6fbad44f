//! Run configuration for a single sync
//!
//! A [`SyncConfig`] describes one engine run: which input tree is watched,
//! where stable files are published and how. It deserializes from any format
//! [`stage_fs::ConfigStore`] understands; every field has a default so a
//! configuration file only needs to name what differs.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stage_fs::Artifact;

use crate::hooks::HookConfig;
use crate::publish::Layout;
use crate::{Error, Result};

fn default_lines() -> u64 {
    10_000
}

fn default_split_program() -> String {
    "split".to_string()
}

fn default_true() -> bool {
    true
}

/// The kind of sync being run.
///
/// Kinds share the engine but use disjoint state and lock artifacts, so an
/// archive run and a prepare run never block each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncKind {
    /// Publish into exactly one output directory
    Archive,
    /// Publish round robin into one or more output directories
    #[default]
    Prepare,
}

impl SyncKind {
    /// Parse a kind from its name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "archive" => Some(Self::Archive),
            "prepare" => Some(Self::Prepare),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Prepare => "prepare",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chunk size used when splitting published files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitLimit {
    /// At most this many lines per chunk
    Lines(u64),
    /// At most this many bytes per chunk
    Bytes(u64),
}

impl SplitLimit {
    /// The `split` flag expressing this limit.
    pub fn to_arg(&self) -> String {
        match self {
            Self::Lines(n) => format!("--lines={}", n),
            Self::Bytes(n) => format!("--bytes={}", n),
        }
    }
}

/// Configuration for one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Which kind of sync this is
    pub kind: SyncKind,

    /// Optional instance name; scopes the state and lock artifacts
    pub name: Option<String>,

    /// Directory of (possibly growing) files
    pub input: Option<PathBuf>,

    /// Output directories, used round robin
    pub outputs: Vec<PathBuf>,

    /// Publish under a total, time-based ordering instead of mirroring
    pub ordered: bool,

    /// Write a checksummed sidecar for every published artifact
    pub metadata: bool,

    /// Split each published file into chunks
    pub split: bool,

    /// Lines per chunk when splitting by lines
    #[serde(default = "default_lines")]
    pub lines: u64,

    /// Bytes per chunk; takes precedence over `lines` when set
    pub bytes: Option<u64>,

    /// Path to the `split` program
    #[serde(default = "default_split_program")]
    pub split_program: String,

    /// Strip carriage returns while feeding the split program
    #[serde(default = "default_true")]
    pub clean: bool,

    /// Classify and log without writing anything
    pub dry_run: bool,

    /// Ignore (but keep) any previously persisted state
    pub restart: bool,

    /// Where state and lock artifacts live; defaults to the temp directory
    pub state_dir: Option<PathBuf>,

    /// Subprocess hooks fired around the run
    pub hooks: Vec<HookConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            kind: SyncKind::default(),
            name: None,
            input: None,
            outputs: Vec::new(),
            ordered: false,
            metadata: false,
            split: false,
            lines: default_lines(),
            bytes: None,
            split_program: default_split_program(),
            clean: true,
            dry_run: false,
            restart: false,
            state_dir: None,
            hooks: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Create a configuration for `kind` syncing `input` into `outputs`.
    pub fn new(kind: SyncKind, input: impl Into<PathBuf>, outputs: Vec<PathBuf>) -> Self {
        Self {
            kind,
            input: Some(input.into()),
            outputs,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the input directory is missing or not a
    /// directory, no output is given, an existing output is not a directory,
    /// an archive sync names more than one output, or a split limit is zero.
    pub fn validate(&self) -> Result<()> {
        let input = match &self.input {
            Some(input) if !input.as_os_str().is_empty() => input,
            _ => return Err(Error::config("A local input directory is required")),
        };
        if !input.exists() {
            return Err(Error::config(format!(
                "Input directory <{}> does not exist",
                input.display()
            )));
        }
        if !input.is_dir() {
            return Err(Error::config(format!(
                "Input directory <{}> is not a directory",
                input.display()
            )));
        }

        if self.outputs.is_empty() {
            return Err(Error::config("At least one output directory is required"));
        }
        if self.kind == SyncKind::Archive && self.outputs.len() > 1 {
            return Err(Error::config(format!(
                "An archive sync takes exactly one output directory, got {}",
                self.outputs.len()
            )));
        }
        for dir in &self.outputs {
            if dir.exists() && !dir.is_dir() {
                return Err(Error::config(format!(
                    "Output directory <{}> exists but is not a directory",
                    dir.display()
                )));
            }
        }

        if self.split {
            match self.split_limit() {
                Some(SplitLimit::Lines(0)) | Some(SplitLimit::Bytes(0)) => {
                    return Err(Error::config("Split size must be greater than zero"));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// The destination layout this configuration publishes with.
    ///
    /// Metadata sidecars hang off the top-level directory of each output
    /// path, which only the ordered layout guarantees, so enabling metadata
    /// forces the ordered layout.
    pub fn layout(&self) -> Layout {
        if self.ordered || self.metadata {
            Layout::Ordered
        } else {
            Layout::Mirrored
        }
    }

    /// The split limit, or `None` when splitting is off.
    pub fn split_limit(&self) -> Option<SplitLimit> {
        if !self.split {
            return None;
        }
        Some(match self.bytes {
            Some(bytes) => SplitLimit::Bytes(bytes),
            None => SplitLimit::Lines(self.lines),
        })
    }

    /// Directory holding state and lock artifacts.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Stem shared by the state and lock artifacts, e.g. `sync-prepare-feeds`.
    pub fn artifact_stem(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => format!("sync-{}-{}", self.kind, name),
            _ => format!("sync-{}", self.kind),
        }
    }

    /// Path of the persisted state for this run.
    pub fn state_path(&self) -> PathBuf {
        Artifact::State.path_in(&self.state_dir(), &self.artifact_stem())
    }

    /// Path of the lock artifact for this run.
    pub fn lock_path(&self) -> PathBuf {
        Artifact::Lock.path_in(&self.state_dir(), &self.artifact_stem())
    }

    /// The configured input directory, or an empty path when unset.
    pub fn input_dir(&self) -> &Path {
        self.input.as_deref().unwrap_or(Path::new(""))
    }
}
