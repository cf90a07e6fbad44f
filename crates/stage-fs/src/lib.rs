//! Filesystem primitives for stagesync
//!
//! Provides atomic writes, content checksums, forward-slash relative paths
//! and format-agnostic configuration loading.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;

pub use config::ConfigStore;
pub use constants::Artifact;
pub use error::{Error, Result};
pub use path::RelPath;
