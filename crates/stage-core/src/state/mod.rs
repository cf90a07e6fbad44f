//! Persisted sync state
//!
//! The state maps every input path ever observed to its [`FileStatus`]. It is
//! loaded at the start of a run, mutated in place while scanning and written
//! back atomically at the end. Entries are never removed: forgetting a
//! processed path would let it be published again.

mod status;

pub use status::FileStatus;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Path → status map for one engine instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncState {
    files: BTreeMap<String, FileStatus>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    // The scanner only records UTF-8 paths, so this never merges two files
    fn key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    /// Status recorded for `path`, if it was ever observed.
    pub fn get(&self, path: &Path) -> Option<FileStatus> {
        self.files.get(&Self::key(path)).copied()
    }

    /// Has `path` already been published?
    pub fn is_processed(&self, path: &Path) -> bool {
        self.get(path).is_some_and(|s| s.is_processed())
    }

    /// Remember the observed `size` of a not-yet-stable path.
    ///
    /// Returns the previous status. A processed path keeps its status.
    pub fn remember_size(&mut self, path: &Path, size: u64) -> Option<FileStatus> {
        let key = Self::key(path);
        match self.files.get(&key).copied() {
            Some(FileStatus::Processed) => Some(FileStatus::Processed),
            previous => {
                self.files.insert(key, FileStatus::Pending(size));
                previous
            }
        }
    }

    /// Record that `path` has been published.
    pub fn mark_processed(&mut self, path: &Path) {
        self.files.insert(Self::key(path), FileStatus::Processed);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over `(path, status)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FileStatus)> {
        self.files.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Loads and saves [`SyncState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    restart: bool,
    dry_run: bool,
}

impl StateStore {
    /// Create a store for the artifact at `path`.
    ///
    /// With `restart`, an existing artifact is ignored on load. With
    /// `dry_run`, saving does nothing.
    pub fn new(path: impl Into<PathBuf>, restart: bool, dry_run: bool) -> Self {
        Self {
            path: path.into(),
            restart,
            dry_run,
        }
    }

    /// Path of the persisted artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state.
    ///
    /// Returns an empty state when no artifact exists or when restarting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateCorrupt`] if the artifact exists but cannot be
    /// parsed. A corrupt artifact is never silently discarded, since that
    /// would republish everything recorded in it.
    pub fn load(&self) -> Result<SyncState> {
        let exists = self.path.exists();

        if self.restart {
            if exists {
                tracing::debug!(path = %self.path.display(), "Ignoring existing state");
            } else {
                tracing::debug!(path = %self.path.display(), "Ignoring (non-existent) state");
            }
            return Ok(SyncState::new());
        }

        if !exists {
            tracing::debug!(path = %self.path.display(), "No prior state");
            return Ok(SyncState::new());
        }

        tracing::debug!(path = %self.path.display(), "Loading existing state");
        let content = std::fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))?;
        serde_json::from_str(&content).map_err(|source| Error::StateCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Save `state` atomically; a no-op under dry-run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateWrite`] if the artifact cannot be written.
    pub fn save(&self, state: &SyncState) -> Result<()> {
        if self.dry_run {
            tracing::debug!(path = %self.path.display(), "Dry run, not saving state");
            return Ok(());
        }

        tracing::debug!(path = %self.path.display(), entries = state.len(), "Saving state");
        let content = serde_json::to_vec(state)?;
        stage_fs::io::write_atomic(&self.path, &content).map_err(|source| Error::StateWrite {
            path: self.path.clone(),
            source,
        })
    }
}
