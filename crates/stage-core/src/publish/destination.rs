//! Destination path construction
//!
//! Two layouts are supported:
//!
//! - **Mirrored**: the output path is the input path relative to the input
//!   root.
//! - **Ordered**: the output path is
//!   `<top-level>/<YYYY>/<MM>/<DD>/<YYYYMMDD-HHMMSS>-<counter>-<flattened input path>`,
//!   which sorts files by publish time and then by publish counter.
//!
//! In both layouts the target directory rotates round robin over the
//! configured outputs by publish counter, so merging the output trees in
//! file-name order reconstructs the publish order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use stage_fs::RelPath;
use stage_fs::constants::{CHUNK_INFIX, CHUNK_SUFFIX_WIDTH};

use crate::{Error, Result};

/// Zero-padding width of the counter in ordered names.
///
/// Padding keeps lexicographic and numeric order in agreement.
pub const COUNTER_WIDTH: usize = 8;

/// Naming strategy for published files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Same relative path as in the input tree
    Mirrored,
    /// Time- and counter-ordered names under daily directories
    Ordered,
}

/// Where a published file goes: a target directory and a path inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Output directory this file was routed to
    pub target_dir: PathBuf,
    /// Output path relative to `target_dir`
    pub relative: RelPath,
}

impl Destination {
    /// Absolute path of the (unsplit) output file.
    pub fn path(&self) -> PathBuf {
        self.relative.under(&self.target_dir)
    }

    /// Directory the output file, or its chunks, live in.
    pub fn parent_dir(&self) -> PathBuf {
        self.relative
            .parent()
            .map(|p| p.under(&self.target_dir))
            .unwrap_or_else(|| self.target_dir.clone())
    }

    /// File-name prefix shared by every chunk, e.g. `a.txt.part-`.
    pub fn chunk_stem(&self) -> String {
        format!("{}{}", self.relative.file_name().unwrap_or_default(), CHUNK_INFIX)
    }

    /// Relative path of chunk number `index`, e.g. `feed/a.txt.part-0003`.
    pub fn chunk_relative(&self, index: usize) -> RelPath {
        self.relative.with_suffix(&format!(
            "{}{:0width$}",
            CHUNK_INFIX,
            index,
            width = CHUNK_SUFFIX_WIDTH
        ))
    }

    /// Relative path of a chunk given its file name in [`Self::parent_dir`].
    pub fn sibling(&self, file_name: &str) -> RelPath {
        match self.relative.parent() {
            Some(parent) => parent.child(file_name),
            None => RelPath::new("").child(file_name),
        }
    }
}

/// Computes destinations for stable files.
#[derive(Debug, Clone)]
pub struct DestinationResolver {
    layout: Layout,
    targets: Vec<PathBuf>,
}

impl DestinationResolver {
    /// Create a resolver publishing with `layout` into `targets`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `targets` is empty.
    pub fn new(layout: Layout, targets: Vec<PathBuf>) -> Result<Self> {
        if targets.is_empty() {
            return Err(Error::config("At least one output directory is required"));
        }
        Ok(Self { layout, targets })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Output directory for the file published with `counter`.
    pub fn target_for(&self, counter: u64) -> &Path {
        let index = (counter % self.targets.len() as u64) as usize;
        &self.targets[index]
    }

    /// Resolve the destination of the input file at `relative`.
    ///
    /// `counter` is the number of files already published in this run and
    /// `now` the publish time; both only matter to the ordered layout and
    /// target rotation.
    pub fn resolve(&self, relative: &RelPath, counter: u64, now: DateTime<Utc>) -> Destination {
        let relative = match self.layout {
            Layout::Mirrored => relative.clone(),
            Layout::Ordered => ordered_path(relative, counter, now),
        };
        Destination {
            target_dir: self.target_for(counter).to_path_buf(),
            relative,
        }
    }
}

/// Ordered output path for `relative`.
pub fn ordered_path(relative: &RelPath, counter: u64, now: DateTime<Utc>) -> RelPath {
    RelPath::new(relative.top_level())
        .join(&now.format("%Y/%m/%d").to_string())
        .child(&slug(relative, counter, now))
}

/// Ordered file name for `relative`, e.g. `20240102-030405-00000007-feed-a.txt`.
pub fn slug(relative: &RelPath, counter: u64, now: DateTime<Utc>) -> String {
    format!(
        "{}-{:0width$}-{}",
        now.format("%Y%m%d-%H%M%S"),
        counter,
        relative.flattened(),
        width = COUNTER_WIDTH
    )
}
