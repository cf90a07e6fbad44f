//! Run hooks
//!
//! Hooks are subprocesses fired around a sync run, configured as `[[hooks]]`
//! entries. They receive the run's kind, name, input and counts in their
//! environment and can reference the same values as `${VAR}` in their
//! arguments.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::sync::SyncCounts;
use crate::{Error, Result};

/// Points in a run where hooks fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookEvent {
    /// Lock taken and state loaded, nothing scanned yet
    PreSync,
    /// Run finished without a run-level error
    PostSync,
    /// Run aborted with a run-level error
    SyncFailed,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreSync => "pre-sync",
            Self::PostSync => "post-sync",
            Self::SyncFailed => "sync-failed",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    pub event: HookEvent,
    /// Program to run, looked up on `PATH`
    pub command: String,
    /// Arguments; `${VAR}` is replaced by the context variable `VAR`
    #[serde(default)]
    pub args: Vec<String>,
    /// Directory to run in; defaults to the input directory
    pub working_dir: Option<PathBuf>,
}

impl HookConfig {
    /// Run this hook to completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the command cannot be started and
    /// [`Error::HookFailed`] if it exits unsuccessfully.
    pub fn run(&self, context: &HookContext, default_dir: &Path) -> Result<()> {
        let args: Vec<String> = self.args.iter().map(|a| context.substitute(a)).collect();
        let dir = self.working_dir.as_deref().unwrap_or(default_dir);

        tracing::debug!(event = %self.event, command = %self.command, ?args, "Running hook");
        let output = Command::new(&self.command)
            .args(&args)
            .current_dir(dir)
            .envs(&context.vars)
            .output()
            .map_err(|e| Error::io(&self.command, e))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut message = match output.status.code() {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        };
        if !stderr.trim().is_empty() {
            message = format!("{}: {}", message, stderr.trim());
        }

        Err(Error::HookFailed {
            event: self.event.to_string(),
            command: self.command.clone(),
            message,
        })
    }
}

/// Variables handed to hooks, both as environment and for `${VAR}`
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    pub vars: BTreeMap<String, String>,
}

impl HookContext {
    /// Context for a run of `config`; counts are added once the scan is done
    pub fn for_run(config: &SyncConfig, counts: Option<&SyncCounts>) -> Self {
        let mut context = Self::default();
        context.set("STAGESYNC_KIND", config.kind);
        context.set("STAGESYNC_NAME", config.name.as_deref().unwrap_or(""));
        context.set("STAGESYNC_INPUT", config.input_dir().display());

        if let Some(c) = counts {
            context.set("STAGESYNC_EXAMINED", c.examined);
            context.set("STAGESYNC_NEW", c.new);
            context.set("STAGESYNC_CHANGED", c.changed);
            context.set("STAGESYNC_PROCESSED", c.processed);
            context.set("STAGESYNC_IGNORED", c.ignored);
            context.set("STAGESYNC_ERROR", c.error);
        }

        context
    }

    /// Add the message of the error that ended the run
    pub fn with_failure(mut self, message: impl fmt::Display) -> Self {
        self.set("STAGESYNC_FAILURE", message);
        self
    }

    fn set(&mut self, key: &str, value: impl fmt::Display) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    /// Replace every `${VAR}` naming a known variable
    fn substitute(&self, input: &str) -> String {
        self.vars.iter().fold(input.to_string(), |acc, (key, value)| {
            acc.replace(&format!("${{{}}}", key), value)
        })
    }
}

/// Run the hooks configured for `event`, in order.
///
/// Stops at the first failure. Returns the number of hooks run.
pub fn run_hooks(
    hooks: &[HookConfig],
    event: HookEvent,
    context: &HookContext,
    default_dir: &Path,
) -> Result<usize> {
    let mut ran = 0;
    for hook in hooks.iter().filter(|h| h.event == event) {
        hook.run(context, default_dir)?;
        ran += 1;
    }
    Ok(ran)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncKind;

    fn sh(event: HookEvent, script: &str) -> HookConfig {
        HookConfig {
            event,
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            working_dir: None,
        }
    }

    #[test]
    fn display_matches_config_spelling() {
        for event in [HookEvent::PreSync, HookEvent::PostSync, HookEvent::SyncFailed] {
            let hook: HookConfig =
                toml::from_str(&format!("event = \"{}\"\ncommand = \"true\"", event)).unwrap();
            assert_eq!(hook.event, event);
        }
        assert!(toml::from_str::<HookConfig>("event = \"pre-push\"\ncommand = \"true\"").is_err());
    }

    #[test]
    fn hook_config_from_toml() {
        let hook: HookConfig = toml::from_str(
            r#"
            event = "sync-failed"
            command = "notify"
            args = ["${STAGESYNC_KIND}"]
            "#,
        )
        .unwrap();
        assert_eq!(hook.event, HookEvent::SyncFailed);
        assert_eq!(hook.args, vec!["${STAGESYNC_KIND}"]);
        assert_eq!(hook.working_dir, None);
    }

    #[test]
    fn context_for_run() {
        let mut config = SyncConfig::new(SyncKind::Archive, "/in", vec!["/out".into()]);
        config.name = Some("feeds".into());
        let counts = SyncCounts {
            examined: 3,
            changed: 4,
            processed: 2,
            error: 1,
            ..SyncCounts::default()
        };

        let ctx = HookContext::for_run(&config, Some(&counts)).with_failure("boom");

        assert_eq!(ctx.vars["STAGESYNC_KIND"], "archive");
        assert_eq!(ctx.vars["STAGESYNC_NAME"], "feeds");
        assert_eq!(ctx.vars["STAGESYNC_INPUT"], "/in");
        assert_eq!(ctx.vars["STAGESYNC_EXAMINED"], "3");
        assert_eq!(ctx.vars["STAGESYNC_CHANGED"], "4");
        assert_eq!(ctx.vars["STAGESYNC_PROCESSED"], "2");
        assert_eq!(ctx.vars["STAGESYNC_ERROR"], "1");
        assert_eq!(ctx.vars["STAGESYNC_FAILURE"], "boom");

        let before = HookContext::for_run(&config, None);
        assert!(!before.vars.contains_key("STAGESYNC_EXAMINED"));
    }

    #[test]
    fn unknown_variables_are_left_alone() {
        let mut ctx = HookContext::default();
        ctx.set("STAGESYNC_KIND", "prepare");

        assert_eq!(
            ctx.substitute("kind=${STAGESYNC_KIND} ${UNKNOWN}"),
            "kind=prepare ${UNKNOWN}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn only_matching_hooks_run() {
        let temp = tempfile::TempDir::new().unwrap();
        let hooks = vec![
            sh(HookEvent::PreSync, "touch pre"),
            sh(HookEvent::PostSync, "touch post"),
        ];

        let ran = run_hooks(&hooks, HookEvent::PostSync, &HookContext::default(), temp.path())
            .unwrap();

        assert_eq!(ran, 1);
        assert!(temp.path().join("post").exists());
        assert!(!temp.path().join("pre").exists());
    }

    #[cfg(unix)]
    #[test]
    fn context_reaches_env_and_args() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = SyncConfig::new(SyncKind::Prepare, temp.path(), vec!["/out".into()]);
        let hooks = vec![HookConfig {
            event: HookEvent::PreSync,
            command: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "printf '%s %s' \"$STAGESYNC_KIND\" \"$1\" > seen".to_string(),
                "hook".to_string(),
                "${STAGESYNC_KIND}".to_string(),
            ],
            working_dir: None,
        }];

        run_hooks(
            &hooks,
            HookEvent::PreSync,
            &HookContext::for_run(&config, None),
            temp.path(),
        )
        .unwrap();

        let seen = std::fs::read_to_string(temp.path().join("seen")).unwrap();
        assert_eq!(seen, "prepare prepare");
    }

    #[cfg(unix)]
    #[test]
    fn first_failure_stops_the_rest() {
        let temp = tempfile::TempDir::new().unwrap();
        let hooks = vec![
            sh(HookEvent::PreSync, "echo nope >&2; exit 3"),
            sh(HookEvent::PreSync, "touch second"),
        ];

        let err = run_hooks(&hooks, HookEvent::PreSync, &HookContext::default(), temp.path())
            .unwrap_err();

        match err {
            Error::HookFailed { event, message, .. } => {
                assert_eq!(event, "pre-sync");
                assert_eq!(message, "exited with status 3: nope");
            }
            other => panic!("expected HookFailed, got {:?}", other),
        }
        assert!(!temp.path().join("second").exists());
    }
}
