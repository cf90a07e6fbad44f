//! Listener configuration for fan-out runs
//!
//! A listener is a named input/output pair. A single configuration file can
//! declare many of them under `[listeners.<name>]`, each optionally carrying
//! per-kind overrides:
//!
//! ```toml
//! input = "/var/inbound"
//! outputs = ["/data/outbound_1", "/data/outbound_2"]
//!
//! [listeners.nasa.prepare]
//! split = true
//! lines = 100000
//!
//! [listeners.usaf]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::settings::{SyncConfig, SyncKind};

/// Per-kind settings a listener may override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerOverrides {
    pub ordered: Option<bool>,
    pub metadata: Option<bool>,
    pub split: Option<bool>,
    pub lines: Option<u64>,
    pub bytes: Option<u64>,
    pub split_program: Option<String>,
    pub clean: Option<bool>,
}

/// Overrides for one listener, keyed by sync kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default)]
    pub archive: Option<ListenerOverrides>,
    #[serde(default)]
    pub prepare: Option<ListenerOverrides>,
}

impl ListenerConfig {
    /// Overrides that apply to `kind`, if any.
    pub fn overrides_for(&self, kind: SyncKind) -> Option<&ListenerOverrides> {
        match kind {
            SyncKind::Archive => self.archive.as_ref(),
            SyncKind::Prepare => self.prepare.as_ref(),
        }
    }
}

/// A configuration file for fan-out runs: shared defaults plus listeners.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncAllConfig {
    /// Settings shared by every listener; `input` and `outputs` are roots
    #[serde(flatten)]
    pub defaults: SyncConfig,

    /// Listeners keyed by name
    #[serde(default)]
    pub listeners: BTreeMap<String, ListenerConfig>,
}

/// Selects which listeners a fan-out run drives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerFilter {
    /// When set, only these listeners run
    pub only: Option<Vec<String>>,
    /// Listeners never run
    pub except: Vec<String>,
}

impl ListenerFilter {
    pub fn allows(&self, name: &str) -> bool {
        if let Some(only) = &self.only
            && !only.iter().any(|n| n == name)
        {
            return false;
        }
        !self.except.iter().any(|n| n == name)
    }
}

impl SyncConfig {
    /// Derive the configuration for listener `name` from these defaults.
    ///
    /// The listener's input and outputs are the `name` subdirectories of the
    /// default roots; the instance name scopes its state and lock artifacts.
    pub fn for_listener(&self, name: &str, listener: &ListenerConfig) -> SyncConfig {
        let mut config = self.clone();
        config.name = Some(name.to_string());
        config.input = self.input.as_ref().map(|dir| dir.join(name));
        config.outputs = self.outputs.iter().map(|dir| dir.join(name)).collect();

        if let Some(o) = listener.overrides_for(self.kind) {
            if let Some(v) = o.ordered {
                config.ordered = v;
            }
            if let Some(v) = o.metadata {
                config.metadata = v;
            }
            if let Some(v) = o.split {
                config.split = v;
            }
            if let Some(v) = o.lines {
                config.lines = v;
            }
            if o.bytes.is_some() {
                config.bytes = o.bytes;
            }
            if let Some(v) = &o.split_program {
                config.split_program = v.clone();
            }
            if let Some(v) = o.clean {
                config.clean = v;
            }
        }

        config
    }
}
