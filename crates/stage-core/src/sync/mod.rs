//! Sync runs
//!
//! - **engine**: a single locked run over one input tree
//! - **all**: fan-out over the listeners of a configuration file

mod all;
mod engine;

pub use all::{ListenerOutcome, SyncAll};
pub use engine::{SyncCounts, SyncEngine, SyncReport};
