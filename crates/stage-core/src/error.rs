//! Error types for stage-core

use std::path::PathBuf;

/// Result type for stage-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stage-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or incomplete run configuration; raised before any lock is taken
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Another run of the same kind and name holds the lock
    #[error("Lockfile {path} exists (owner pid: {}), aborting", owner_label(.pid))]
    LockHeld { path: PathBuf, pid: Option<u32> },

    /// Persisted state exists but cannot be parsed
    #[error("State at {path} is corrupt: {source}")]
    StateCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Persisted state could not be written
    #[error("Couldn't save state to {path}: {source}")]
    StateWrite {
        path: PathBuf,
        #[source]
        source: stage_fs::Error,
    },

    /// I/O failure at a known path
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external split program exited unsuccessfully
    #[error("Split command failed (exit code {code:?}): {stderr}")]
    SplitFailed { code: Option<i32>, stderr: String },

    /// A run hook exited unsuccessfully
    #[error("Hook '{command}' for {event} failed: {message}")]
    HookFailed {
        event: String,
        command: String,
        message: String,
    },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from stage-fs
    #[error(transparent)]
    Fs(#[from] stage_fs::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn owner_label(pid: &Option<u32>) -> String {
    pid.map(|p| p.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
