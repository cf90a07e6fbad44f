//! Fan-out over listeners
//!
//! A fan-out run drives one [`SyncEngine`] per listener, in name order,
//! under its own per-kind lock. Each listener keeps its own state and lock
//! artifacts, so a listener that fails (or is already running on its own)
//! never stops the others.

use std::path::PathBuf;

use stage_fs::Artifact;

use super::engine::{SyncEngine, SyncReport};
use crate::Result;
use crate::config::{ListenerFilter, SyncAllConfig, SyncKind};
use crate::lock::LockGuard;

/// Result of one listener's run.
#[derive(Debug)]
pub struct ListenerOutcome {
    pub name: String,
    pub result: Result<SyncReport>,
}

impl ListenerOutcome {
    /// True if the run completed and no file failed
    pub fn succeeded(&self) -> bool {
        self.result.as_ref().is_ok_and(|r| !r.failed())
    }
}

/// Runs every selected listener of a [`SyncAllConfig`].
#[derive(Debug, Clone)]
pub struct SyncAll {
    kind: SyncKind,
    config: SyncAllConfig,
    filter: ListenerFilter,
}

impl SyncAll {
    pub fn new(kind: SyncKind, config: SyncAllConfig, filter: ListenerFilter) -> Self {
        Self {
            kind,
            config,
            filter,
        }
    }

    /// Path of the fan-out lock, e.g. `sync-all-prepare.lock`
    pub fn lock_path(&self) -> PathBuf {
        Artifact::Lock.path_in(
            &self.config.defaults.state_dir(),
            &format!("sync-all-{}", self.kind),
        )
    }

    /// Names of the listeners this run will drive, in run order
    pub fn selected(&self) -> Vec<&str> {
        self.config
            .listeners
            .keys()
            .map(String::as_str)
            .filter(|name| self.filter.allows(name))
            .collect()
    }

    /// Run every selected listener.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockHeld`] if another fan-out of the same kind
    /// is running. Listener failures are reported per listener instead.
    pub fn run(&self) -> Result<Vec<ListenerOutcome>> {
        let lock = LockGuard::acquire(self.lock_path())?;

        let mut defaults = self.config.defaults.clone();
        defaults.kind = self.kind;

        let mut outcomes = Vec::new();
        for (name, listener) in &self.config.listeners {
            if !self.filter.allows(name) {
                tracing::debug!(listener = %name, "Skipping listener");
                continue;
            }

            tracing::info!(listener = %name, kind = %self.kind, "Syncing listener");
            let result = SyncEngine::new(defaults.for_listener(name, listener)).run();
            if let Err(e) = &result {
                tracing::error!(listener = %name, error = %e, "Listener sync failed");
            }

            outcomes.push(ListenerOutcome {
                name: name.clone(),
                result,
            });
        }

        lock.release()?;
        Ok(outcomes)
    }
}
