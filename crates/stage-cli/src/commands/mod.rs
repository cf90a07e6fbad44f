//! Command implementations

mod sync;
mod sync_all;

pub use sync::run_sync;
pub use sync_all::run_sync_all;
