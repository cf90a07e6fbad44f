//! Forward-slash relative paths
//!
//! Destination layouts, metadata records and state keys all talk about paths
//! relative to some root. [`RelPath`] keeps those as `/`-separated strings and
//! converts to native paths only when touching the filesystem.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::ROOT_TOP_LEVEL;
use crate::{Error, Result};

/// A relative path normalized to forward slashes without empty segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelPath {
    inner: String,
}

impl RelPath {
    /// Create a relative path from a string.
    ///
    /// Leading `/`, `.` segments and empty segments are dropped. On Windows
    /// backslashes are separators too; elsewhere they are ordinary name bytes.
    pub fn new(path: &str) -> Self {
        #[cfg(windows)]
        let path = &path.replace('\\', "/");

        let inner = path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self { inner }
    }

    /// Compute the path of `path` relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutsideRoot`] if `path` does not live under `root`
    /// and [`Error::NonUtf8Path`] if any segment is not valid UTF-8.
    pub fn relative_to(path: &Path, root: &Path) -> Result<Self> {
        let stripped = path.strip_prefix(root).map_err(|_| Error::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

        let segments = stripped
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s),
                _ => None,
            })
            .map(|s| {
                s.to_str().ok_or_else(|| Error::NonUtf8Path {
                    path: path.to_path_buf(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            inner: segments.join("/"),
        })
    }

    /// Get the internal string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// True for the empty path (the root itself).
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over the `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/').filter(|s| !s.is_empty())
    }

    /// Append one or more segments.
    pub fn join(&self, segment: &str) -> Self {
        let tail = Self::new(segment);
        if self.inner.is_empty() {
            tail
        } else if tail.inner.is_empty() {
            self.clone()
        } else {
            Self {
                inner: format!("{}/{}", self.inner, tail.inner),
            }
        }
    }

    /// Append `segment`, a single file name, verbatim.
    ///
    /// Unlike [`Self::join`], `segment` is not normalized.
    pub fn child(&self, segment: &str) -> Self {
        if self.inner.is_empty() {
            Self {
                inner: segment.to_string(),
            }
        } else {
            Self {
                inner: format!("{}/{}", self.inner, segment),
            }
        }
    }

    /// Split off the first segment.
    ///
    /// Returns `(first, Some(rest))` when there is more than one segment and
    /// `(whole, None)` otherwise.
    pub fn split_first(&self) -> (&str, Option<&str>) {
        match self.inner.split_once('/') {
            Some((first, rest)) => (first, Some(rest)),
            None => (&self.inner, None),
        }
    }

    /// The top-level directory this path lives in.
    ///
    /// A path with a single segment lives directly in the root and reports
    /// [`ROOT_TOP_LEVEL`].
    pub fn top_level(&self) -> &str {
        match self.split_first() {
            (first, Some(_)) => first,
            (_, None) => ROOT_TOP_LEVEL,
        }
    }

    /// The whole path flattened into a single file-name-safe segment.
    pub fn flattened(&self) -> String {
        self.inner.replace('/', "-")
    }

    /// Get the final segment.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Get the parent path; `None` for the empty path.
    pub fn parent(&self) -> Option<Self> {
        if self.inner.is_empty() {
            return None;
        }
        Some(match self.inner.rfind('/') {
            Some(idx) => Self {
                inner: self.inner[..idx].to_string(),
            },
            None => Self {
                inner: String::new(),
            },
        })
    }

    /// Append `suffix` to the final segment.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            inner: format!("{}{}", self.inner, suffix),
        }
    }

    /// Resolve this path under a native `root`.
    pub fn under(&self, root: &Path) -> PathBuf {
        self.segments().fold(root.to_path_buf(), |acc, s| acc.join(s))
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for RelPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RelPath {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}
