//! Fail-fast run lock
//!
//! A lock is a file holding the owner's pid; its existence alone excludes
//! other runs of the same kind and name. Acquisition never waits. A lock
//! left behind by a crashed run stays until an operator removes it.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Holds a lock artifact for as long as it lives.
///
/// The artifact is removed by [`LockGuard::release`] or, on any other exit
/// path, when the guard is dropped.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    /// Create the lock artifact at `path` and write our pid into it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockHeld`] immediately if the artifact already
    /// exists, or [`Error::Io`] if it cannot be created.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let pid = read_pid(&path);
                return Err(Error::LockHeld { path, pid });
            }
            Err(e) => return Err(Error::io(&path, e)),
        };

        // From here on the guard owns the artifact, so a failed write still cleans up
        let guard = Self {
            path,
            released: false,
        };

        let pid = std::process::id();
        tracing::debug!(pid, path = %guard.path.display(), "Writing pid to lockfile");
        file.write_all(pid.to_string().as_bytes())
            .map_err(|e| Error::io(&guard.path, e))?;

        Ok(guard)
    }

    /// Path of the held artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the lock artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the artifact cannot be removed.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        tracing::debug!(path = %self.path.display(), "Deleting lockfile");
        fs::remove_file(&self.path).map_err(|e| Error::io(&self.path, e))
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::debug!(path = %self.path.display(), "Deleting lockfile");
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Could not delete lockfile");
        }
    }
}

/// Read the owner pid from an existing lock artifact.
fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
