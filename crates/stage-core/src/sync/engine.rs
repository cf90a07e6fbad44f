//! SyncEngine implementation
//!
//! One run moves through
//! `Validated -> Locked -> Scanning/Publishing -> Persisting -> Unlocked`.
//! Configuration errors surface before the lock is taken. Once locked, the
//! lock is released on every exit path, and state is saved even when the run
//! fails after loading it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::{SyncConfig, SyncKind};
use crate::hooks::{HookContext, HookEvent, run_hooks};
use crate::lock::LockGuard;
use crate::publish::Publisher;
use crate::scan::{QuiescenceScanner, ScanCounts};
use crate::state::{StateStore, SyncState};
use crate::{Error, Result};

/// Per-run tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    /// Non-directory paths seen
    pub examined: u64,
    /// Paths seen for the first time
    pub new: u64,
    /// Paths whose size moved since the last run
    pub changed: u64,
    /// Paths published in this run
    pub processed: u64,
    /// Paths published by an earlier run
    pub ignored: u64,
    /// Paths that could not be read or published
    pub error: u64,
}

impl SyncCounts {
    fn absorb(&mut self, scan: ScanCounts) {
        self.examined += scan.examined;
        self.new += scan.new;
        self.changed += scan.changed;
        self.ignored += scan.ignored;
        self.error += scan.error;
    }
}

/// What a run did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub kind: SyncKind,
    pub name: Option<String>,
    pub counts: SyncCounts,
    /// Every data artifact written (or, under dry-run, planned)
    pub published: Vec<PathBuf>,
    pub duration_ms: u64,
    pub dry_run: bool,
}

impl SyncReport {
    fn new(config: &SyncConfig) -> Self {
        Self {
            kind: config.kind,
            name: config.name.clone(),
            counts: SyncCounts::default(),
            published: Vec::new(),
            duration_ms: 0,
            dry_run: config.dry_run,
        }
    }

    /// True unless some file examined in this run failed
    pub fn success(&self) -> bool {
        self.counts.examined == 0 || self.counts.error == 0
    }

    /// True when at least one file failed
    pub fn failed(&self) -> bool {
        self.counts.error > 0
    }
}

/// Runs one sync described by a [`SyncConfig`].
#[derive(Debug, Clone)]
pub struct SyncEngine {
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run the sync once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid configuration (no lock is
    /// taken), [`Error::LockHeld`] if another run of the same kind and name
    /// is in progress, [`Error::StateCorrupt`] if the persisted state cannot
    /// be read, [`Error::HookFailed`] if a `pre-sync` hook fails, and
    /// [`Error::StateWrite`] if the state cannot be saved. Failures of
    /// individual files are counted in the report instead.
    pub fn run(&self) -> Result<SyncReport> {
        let started = Instant::now();
        let config = &self.config;

        config.validate()?;
        let input = dunce::canonicalize(config.input_dir())
            .map_err(|e| Error::io(config.input_dir(), e))?;
        let mut publisher = Publisher::from_config(config, self.targets()?)?;

        let lock = LockGuard::acquire(config.lock_path())?;
        tracing::info!(
            kind = %config.kind,
            name = config.name.as_deref().unwrap_or(""),
            input = %input.display(),
            dry_run = config.dry_run,
            "Starting sync"
        );

        let store = StateStore::new(config.state_path(), config.restart, config.dry_run);
        let mut state = match store.load() {
            Ok(state) => state,
            Err(e) => {
                self.fire_failed(&input, None, &e);
                return Err(e);
            }
        };

        if let Err(e) = run_hooks(
            &config.hooks,
            HookEvent::PreSync,
            &HookContext::for_run(config, None),
            &input,
        ) {
            self.fire_failed(&input, None, &e);
            return Err(e);
        }

        let mut report = sync(&input, &mut publisher, &mut state, SyncReport::new(config));

        let saved = store.save(&state);
        let released = lock.release();
        report.duration_ms = started.elapsed().as_millis() as u64;

        if let Err(e) = saved.and(released) {
            self.fire_failed(&input, Some(&report.counts), &e);
            return Err(e);
        }

        let counts = report.counts;
        tracing::info!(
            examined = counts.examined,
            new = counts.new,
            changed = counts.changed,
            processed = counts.processed,
            ignored = counts.ignored,
            error = counts.error,
            duration_ms = report.duration_ms,
            "Sync complete"
        );

        if let Err(e) = run_hooks(
            &config.hooks,
            HookEvent::PostSync,
            &HookContext::for_run(config, Some(&counts)),
            &input,
        ) {
            tracing::warn!(error = %e, "post-sync hook failed");
        }

        Ok(report)
    }

    /// Output directories as absolute paths, in rotation order.
    fn targets(&self) -> Result<Vec<PathBuf>> {
        let cwd = std::env::current_dir().map_err(|e| Error::io(".", e))?;
        Ok(self
            .config
            .outputs
            .iter()
            .map(|dir| absolute(&cwd, dir))
            .collect())
    }

    fn fire_failed(&self, input: &Path, counts: Option<&SyncCounts>, error: &Error) {
        let context = HookContext::for_run(&self.config, counts).with_failure(error.to_string());
        if let Err(e) = run_hooks(&self.config.hooks, HookEvent::SyncFailed, &context, input) {
            tracing::warn!(error = %e, "sync-failed hook failed");
        }
    }
}

/// One scan of `input`, publishing every stable file.
fn sync(
    input: &Path,
    publisher: &mut Publisher,
    state: &mut SyncState,
    mut report: SyncReport,
) -> SyncReport {
    let scanner = QuiescenceScanner::new(input);
    let mut scan = scanner.scan(state);

    while let Some(file) = scan.next() {
        match publisher.publish(&file) {
            Ok(published) => {
                scan.mark_processed(&file.path);
                report.counts.processed += 1;
                report.published.extend(published.artifacts);
            }
            Err(_) => report.counts.error += 1,
        }
    }

    report.counts.absorb(scan.counts());
    report
}

fn absolute(cwd: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        cwd.join(dir)
    }
}
