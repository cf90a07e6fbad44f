//! Publishing stable files
//!
//! The [`Publisher`] is built once per run from a [`SyncConfig`]. It owns the
//! run's publish counter, which orders files in the ordered layout and
//! rotates them over the output directories.
//!
//! ```text
//! StableFile -> DestinationResolver -> Materializer -> MetadataEmitter
//!                   (layout)          (link | split)     (optional)
//! ```

mod destination;
mod materialize;
mod metadata;

pub use destination::{COUNTER_WIDTH, Destination, DestinationResolver, Layout, ordered_path, slug};
pub use materialize::{HardlinkMaterializer, Materializer, SplitMaterializer};
pub use metadata::{MetadataEmitter, MetadataRecord, metadata_path_for};

use std::path::PathBuf;

use chrono::Utc;

use crate::config::SyncConfig;
use crate::scan::StableFile;
use crate::{Error, Result};

/// Callbacks around each publish.
///
/// All methods default to doing nothing, except [`PublishHooks::on_error`]
/// which logs the failure.
pub trait PublishHooks: Send + Sync {
    /// Called once the destination is known, before anything is written
    fn before_publish(&self, _file: &StableFile, _destination: &Destination) {}

    /// Called after the file and its sidecars were written
    fn after_publish(&self, _published: &Published) {}

    /// Called when publishing `file` failed
    fn on_error(&self, file: &StableFile, error: &Error) {
        tracing::error!(path = %file.path.display(), error = %error, "Could not publish file");
    }
}

/// The default hooks: log failures, nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHooks;

impl PublishHooks for LogHooks {}

/// Outcome of publishing one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Input path
    pub source: PathBuf,
    /// Where the file was routed
    pub destination: Destination,
    /// Absolute paths of every data artifact produced
    pub artifacts: Vec<PathBuf>,
    /// Absolute paths of every sidecar written
    pub sidecars: Vec<PathBuf>,
}

/// Publishes stable files with a strategy chosen at construction.
pub struct Publisher {
    resolver: DestinationResolver,
    materializer: Box<dyn Materializer>,
    metadata: Option<MetadataEmitter>,
    hooks: Box<dyn PublishHooks>,
    counter: u64,
}

impl Publisher {
    pub fn new(
        resolver: DestinationResolver,
        materializer: Box<dyn Materializer>,
        metadata: Option<MetadataEmitter>,
    ) -> Self {
        Self {
            resolver,
            materializer,
            metadata,
            hooks: Box::new(LogHooks),
            counter: 0,
        }
    }

    /// Build the publisher described by `config`, writing into `targets`.
    ///
    /// `targets` are the resolved output directories, in rotation order.
    pub fn from_config(config: &SyncConfig, targets: Vec<PathBuf>) -> Result<Self> {
        let resolver = DestinationResolver::new(config.layout(), targets)?;

        let materializer: Box<dyn Materializer> = match config.split_limit() {
            Some(limit) => Box::new(SplitMaterializer::new(
                limit,
                config.split_program.clone(),
                config.clean,
                config.dry_run,
            )),
            None => Box::new(HardlinkMaterializer::new(config.dry_run)),
        };

        let metadata = config
            .metadata
            .then(|| MetadataEmitter::new(config.dry_run));

        Ok(Self::new(resolver, materializer, metadata))
    }

    /// Replace the publish hooks
    pub fn with_hooks(mut self, hooks: Box<dyn PublishHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Number of files published so far in this run
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn layout(&self) -> Layout {
        self.resolver.layout()
    }

    /// Publish one stable file.
    ///
    /// The counter advances only when this returns `Ok`. Sidecar failures are
    /// logged and do not fail the publish.
    ///
    /// # Errors
    ///
    /// Returns the materializer's error; the caller must leave the file
    /// pending so it is retried.
    pub fn publish(&mut self, file: &StableFile) -> Result<Published> {
        let destination = self.resolver.resolve(&file.relative, self.counter, Utc::now());
        self.hooks.before_publish(file, &destination);

        let produced = match self.materializer.materialize(&file.path, &destination) {
            Ok(produced) => produced,
            Err(e) => {
                self.hooks.on_error(file, &e);
                return Err(e);
            }
        };

        let mut sidecars = Vec::new();
        if let Some(emitter) = &self.metadata {
            for artifact in &produced {
                match emitter.emit(&destination.target_dir, artifact) {
                    Ok(Some(sidecar)) => sidecars.push(sidecar),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(artifact = %artifact, error = %e, "Could not write metadata");
                    }
                }
            }
        }

        let published = Published {
            source: file.path.clone(),
            artifacts: produced
                .iter()
                .map(|a| a.under(&destination.target_dir))
                .collect(),
            destination,
            sidecars,
        };

        self.counter += 1;
        tracing::debug!(
            from = %file.path.display(),
            to = %published.destination.path().display(),
            strategy = self.materializer.name(),
            counter = self.counter,
            "Published"
        );
        self.hooks.after_publish(&published);

        Ok(published)
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("resolver", &self.resolver)
            .field("materializer", &self.materializer.name())
            .field("metadata", &self.metadata)
            .field("counter", &self.counter)
            .finish()
    }
}
