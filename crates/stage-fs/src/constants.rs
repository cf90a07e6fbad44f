//! Constants and enums for the on-disk layout.

use std::path::{Path, PathBuf};

/// Top-level name used for files that live directly in an input root.
pub const ROOT_TOP_LEVEL: &str = "root";

/// Suffix appended to the top-level directory of a metadata sidecar tree.
pub const META_DIR_SUFFIX: &str = "_meta";

/// Extension appended to every metadata sidecar.
pub const META_EXTENSION: &str = ".meta";

/// Infix between a file name and its numeric chunk suffix.
pub const CHUNK_INFIX: &str = ".part-";

/// Width of the zero-padded numeric chunk suffix.
pub const CHUNK_SUFFIX_WIDTH: usize = 4;

/// Per-run artifacts kept in the state directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// Persisted path → status map
    State,
    /// Mutual-exclusion marker holding the owner pid
    Lock,
}

impl Artifact {
    /// Get the file extension of this artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::State => "json",
            Self::Lock => "lock",
        }
    }

    /// Path of this artifact for the given `stem` inside `dir`.
    pub fn path_in(&self, dir: &Path, stem: &str) -> PathBuf {
        dir.join(format!("{}.{}", stem, self.extension()))
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State => write!(f, "state"),
            Self::Lock => write!(f, "lock"),
        }
    }
}
