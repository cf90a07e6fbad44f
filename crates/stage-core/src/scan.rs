//! Quiescence detection
//!
//! A file is considered finished arriving once two consecutive scans observe
//! the same byte length. The scanner walks the input tree once, records new
//! sizes into the [`SyncState`] and yields the files that are stable. It never
//! marks anything processed itself; that happens only after a successful
//! publish, through [`Scan::mark_processed`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stage_fs::RelPath;
use walkdir::WalkDir;

use crate::state::{FileStatus, SyncState};

/// A file whose size did not change since the previous scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableFile {
    /// Absolute path in the input tree
    pub path: PathBuf,
    /// Path relative to the input root
    pub relative: RelPath,
    /// Observed byte length
    pub size: u64,
}

/// How one observation compares with the recorded status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Never seen before
    New,
    /// Seen before at a different size
    Changed { previous: u64 },
    /// Same size as last time: finished arriving
    Stable,
    /// Published by an earlier run
    AlreadyProcessed,
}

/// Classify a file of `size` bytes against its recorded `status`.
pub fn classify(status: Option<FileStatus>, size: u64) -> Observation {
    match status {
        None => Observation::New,
        Some(FileStatus::Processed) => Observation::AlreadyProcessed,
        Some(FileStatus::Pending(previous)) if previous == size => Observation::Stable,
        Some(FileStatus::Pending(previous)) => Observation::Changed { previous },
    }
}

/// Tallies kept while scanning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCounts {
    /// Non-directory paths seen
    pub examined: u64,
    /// First observations
    pub new: u64,
    /// Paths whose size moved since the last scan
    pub changed: u64,
    /// Paths already published
    pub ignored: u64,
    /// Paths that could not be read
    pub error: u64,
}

/// Walks an input root looking for stable files.
#[derive(Debug, Clone)]
pub struct QuiescenceScanner {
    root: PathBuf,
}

impl QuiescenceScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a single pass over the input tree.
    ///
    /// Entries are visited depth-first, sorted by file name within each
    /// directory, so the order is stable between runs.
    pub fn scan<'a>(&self, state: &'a mut SyncState) -> Scan<'a> {
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Scan {
            root: self.root.clone(),
            walker,
            state,
            counts: ScanCounts::default(),
        }
    }
}

/// One in-progress pass; yields [`StableFile`]s lazily.
pub struct Scan<'a> {
    root: PathBuf,
    walker: walkdir::IntoIter,
    state: &'a mut SyncState,
    counts: ScanCounts,
}

impl Scan<'_> {
    /// Counts accumulated so far
    pub fn counts(&self) -> ScanCounts {
        self.counts
    }

    /// Record that `path` was published.
    pub fn mark_processed(&mut self, path: &Path) {
        self.state.mark_processed(path);
    }

    /// Look at one non-directory path; returns it if stable.
    fn observe(&mut self, path: &Path) -> Option<StableFile> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.counts.examined += 1;
                self.counts.error += 1;
                tracing::warn!(path = %path.display(), error = %e, "Could not stat file");
                return None;
            }
        };

        // Symlinks to directories are neither traversed nor counted
        if metadata.is_dir() {
            return None;
        }

        self.counts.examined += 1;
        let size = metadata.len();

        // State keys and output names hold only lossless UTF-8 paths
        let relative = match RelPath::relative_to(path, &self.root) {
            Ok(relative) if path.to_str().is_some() => relative,
            Ok(_) => {
                self.counts.error += 1;
                tracing::warn!(path = %path.display(), "Skipping file with non-UTF-8 path");
                return None;
            }
            Err(e) => {
                self.counts.error += 1;
                tracing::warn!(path = %path.display(), error = %e, "Skipping file");
                return None;
            }
        };

        match classify(self.state.get(path), size) {
            Observation::AlreadyProcessed => {
                self.counts.ignored += 1;
                None
            }
            Observation::Stable => Some(StableFile {
                path: path.to_path_buf(),
                relative,
                size,
            }),
            Observation::New => {
                self.counts.new += 1;
                tracing::debug!(path = %path.display(), size, "New file");
                self.state.remember_size(path, size);
                None
            }
            Observation::Changed { previous } => {
                self.counts.changed += 1;
                tracing::debug!(path = %path.display(), previous, size, "File still growing");
                self.state.remember_size(path, size);
                None
            }
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = StableFile;

    fn next(&mut self) -> Option<StableFile> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    self.counts.error += 1;
                    tracing::warn!(error = %e, "Could not walk input tree");
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            if let Some(stable) = self.observe(entry.path()) {
                return Some(stable);
            }
        }
    }
}
