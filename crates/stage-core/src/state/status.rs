//! Per-path status tracked between runs

use serde::{Deserialize, Serialize};

/// Where a single input path stands.
///
/// Persisted as a bare JSON integer (the last observed size) for
/// [`FileStatus::Pending`] and as `true` for [`FileStatus::Processed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStatus", into = "RawStatus")]
pub enum FileStatus {
    /// Seen at this byte length, not yet stable
    Pending(u64),
    /// Already published; never published again
    Processed,
}

impl FileStatus {
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Size(u64),
    Flag(bool),
}

impl TryFrom<RawStatus> for FileStatus {
    type Error = String;

    fn try_from(raw: RawStatus) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawStatus::Size(size) => Ok(Self::Pending(size)),
            RawStatus::Flag(true) => Ok(Self::Processed),
            RawStatus::Flag(false) => Err("`false` is not a valid file status".to_string()),
        }
    }
}

impl From<FileStatus> for RawStatus {
    fn from(status: FileStatus) -> Self {
        match status {
            FileStatus::Pending(size) => Self::Size(size),
            FileStatus::Processed => Self::Flag(true),
        }
    }
}
