//! Checksummed metadata sidecars
//!
//! Every published artifact can get a small JSON sidecar describing its size
//! and checksum. Sidecars live in a parallel `<top-level>_meta` tree inside
//! the same target directory as the data, with a `.meta` extension, so they
//! sort after the data and travel with it when target trees are merged. A
//! downstream consumer treats the presence of the sidecar as the signal that
//! the data has fully arrived.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stage_fs::RelPath;
use stage_fs::checksum::compute_file_checksum;
use stage_fs::constants::{META_DIR_SUFFIX, META_EXTENSION, ROOT_TOP_LEVEL};

use crate::{Error, Result};

/// Contents of a sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Artifact path relative to its target directory
    pub path: RelPath,
    /// Sidecar path relative to the same target directory
    pub meta_path: RelPath,
    /// Artifact length in bytes
    pub size: u64,
    /// `sha256:<hex>` digest of the artifact
    pub checksum: String,
}

/// Sidecar path for the artifact at `relative`.
///
/// `feed/2024/01/02/x` becomes `feed_meta/2024/01/02/x.meta`.
pub fn metadata_path_for(relative: &RelPath) -> RelPath {
    let (top, rest) = match relative.split_first() {
        (first, Some(rest)) => (first, rest),
        (whole, None) => (ROOT_TOP_LEVEL, whole),
    };
    RelPath::new(&format!("{}{}", top, META_DIR_SUFFIX))
        .join(rest)
        .with_suffix(META_EXTENSION)
}

/// Writes sidecars for published artifacts.
#[derive(Debug, Clone, Copy)]
pub struct MetadataEmitter {
    dry_run: bool,
}

impl MetadataEmitter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Describe the artifact at `relative` inside `target_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the artifact cannot be read.
    pub fn describe(&self, target_dir: &Path, relative: &RelPath) -> Result<MetadataRecord> {
        let artifact = relative.under(target_dir);
        let size = std::fs::metadata(&artifact)
            .map_err(|e| Error::io(&artifact, e))?
            .len();
        let checksum = compute_file_checksum(&artifact).map_err(|e| Error::io(&artifact, e))?;

        Ok(MetadataRecord {
            path: relative.clone(),
            meta_path: metadata_path_for(relative),
            size,
            checksum,
        })
    }

    /// Write the sidecar for the artifact at `relative` inside `target_dir`.
    ///
    /// Returns the sidecar's absolute path, or `None` under dry-run.
    pub fn emit(&self, target_dir: &Path, relative: &RelPath) -> Result<Option<PathBuf>> {
        if self.dry_run {
            tracing::debug!(
                path = %metadata_path_for(relative),
                "Dry run, not writing metadata"
            );
            return Ok(None);
        }

        let record = self.describe(target_dir, relative)?;
        let sidecar = record.meta_path.under(target_dir);
        let content = serde_json::to_vec(&record)?;
        stage_fs::io::write_atomic(&sidecar, &content)?;
        tracing::debug!(path = %sidecar.display(), size = record.size, "Wrote metadata");

        Ok(Some(sidecar))
    }
}
