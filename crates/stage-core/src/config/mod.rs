//! Configuration for sync runs
//!
//! - [`SyncConfig`]: settings for a single engine run
//! - [`SyncAllConfig`]: shared defaults plus named listeners for fan-out runs

mod listeners;
mod settings;

pub use listeners::{ListenerConfig, ListenerFilter, ListenerOverrides, SyncAllConfig};
pub use settings::{SplitLimit, SyncConfig, SyncKind};
