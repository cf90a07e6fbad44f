//! Shared test utilities for the stagesync workspace.
//!
//! This crate provides standardised fixtures for the engine and CLI test
//! suites. It is a dev-dependency only, never published.
//!
//! - [`StagingTree`]: a temporary input directory, output directories and
//!   state directory, with helpers to simulate arriving files

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

/// A temporary staging layout:
///
/// ```text
/// <root>/input/
/// <root>/output-0/ ... <root>/output-N/
/// <root>/state/
/// ```
///
/// # Example
///
/// ```rust,no_run
/// use stage_test_utils::StagingTree;
///
/// let tree = StagingTree::with_outputs(2);
/// tree.write("feed/a.txt", "hello\n");
/// assert!(tree.input().join("feed/a.txt").exists());
/// ```
pub struct StagingTree {
    temp_dir: TempDir,
    outputs: usize,
}

impl Default for StagingTree {
    fn default() -> Self {
        Self::new()
    }
}

impl StagingTree {
    /// A tree with a single output directory.
    pub fn new() -> Self {
        Self::with_outputs(1)
    }

    /// A tree with `outputs` output directories.
    ///
    /// Output directories are named but not created, so the engine creates
    /// them on first publish.
    pub fn with_outputs(outputs: usize) -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("input")).unwrap();
        fs::create_dir_all(temp_dir.path().join("state")).unwrap();
        Self { temp_dir, outputs }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn input(&self) -> PathBuf {
        self.root().join("input")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root().join("state")
    }

    /// Output directory number `index`.
    pub fn output(&self, index: usize) -> PathBuf {
        self.root().join(format!("output-{}", index))
    }

    /// All output directories, in rotation order.
    pub fn outputs(&self) -> Vec<PathBuf> {
        (0..self.outputs).map(|i| self.output(i)).collect()
    }

    /// Create or replace the input file at `relative`.
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.input().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Append to the input file at `relative`, simulating a growing file.
    pub fn append(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.input().join(relative);
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .unwrap_or_else(|e| panic!("Could not open {}: {}", path.display(), e));
        file.write_all(content.as_ref()).unwrap();
        path
    }

    /// Remove the input file at `relative`.
    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.input().join(relative)).unwrap();
    }

    /// Files under `dir`, relative to it, with `/` separators, sorted.
    ///
    /// Returns an empty list when `dir` does not exist.
    pub fn files_in(dir: &Path) -> Vec<String> {
        if !dir.exists() {
            return Vec::new();
        }
        WalkDir::new(dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| entry.unwrap())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(dir)
                    .unwrap()
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect()
    }

    /// Files in output directory number `index`.
    pub fn output_files(&self, index: usize) -> Vec<String> {
        Self::files_in(&self.output(index))
    }

    /// Read a file relative to output directory number `index`.
    ///
    /// # Panics
    /// Panics with the full path if the file cannot be read.
    pub fn read_output(&self, index: usize, relative: &str) -> String {
        let path = self.output(index).join(relative);
        fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    /// Assert that `relative` exists in output directory number `index`.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_output_exists(&self, index: usize, relative: &str) {
        let path = self.output(index).join(relative);
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }
}
