//! Incremental staging-directory archival engine
//!
//! Files land in an input directory over time, possibly still being written.
//! Each run scans the tree, decides which files have finished arriving and
//! publishes each of them exactly once into one or more output directories.
//!
//! - **Quiescence detection**: a file is stable once two consecutive runs see
//!   the same size
//! - **Persistent state**: every observed path and whether it was published
//! - **Run lock**: one run per kind and instance name, fail-fast
//! - **Publishing**: hard links or numbered chunks, mirrored or time-ordered,
//!   round robin over the outputs, with optional checksummed sidecars
//!
//! # Architecture
//!
//! ```text
//!                  stage-cli
//!                      |
//!                 stage-core
//!   SyncEngine -> LockGuard, StateStore
//!              -> QuiescenceScanner -> Publisher -> MetadataEmitter
//!                      |
//!                  stage-fs
//! ```
//!
//! # Example
//!
//! ```no_run
//! use stage_core::{SyncConfig, SyncEngine, SyncKind};
//!
//! fn example() -> stage_core::Result<()> {
//!     let config = SyncConfig::new(SyncKind::Archive, "/var/inbound", vec!["/data/archive".into()]);
//!     let report = SyncEngine::new(config).run()?;
//!     println!("published {} files", report.counts.processed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod lock;
pub mod publish;
pub mod scan;
pub mod state;
pub mod sync;

pub use config::{
    ListenerConfig, ListenerFilter, ListenerOverrides, SplitLimit, SyncAllConfig, SyncConfig,
    SyncKind,
};
pub use error::{Error, Result};
pub use hooks::{HookConfig, HookContext, HookEvent, run_hooks};
pub use lock::LockGuard;
pub use publish::{
    Destination, DestinationResolver, Layout, MetadataEmitter, MetadataRecord, Published,
    Publisher, PublishHooks,
};
pub use scan::{QuiescenceScanner, StableFile};
pub use state::{FileStatus, StateStore, SyncState};
pub use sync::{ListenerOutcome, SyncAll, SyncCounts, SyncEngine, SyncReport};
