// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [runner]
/// shell = "bash"
/// shell_args = ["-c"]
/// grace_period = "3s"
/// kill_timeout = "2s"
/// kill_attempts = 3
///
/// [env]
/// NO_COLOR = "1"
/// ```
///
/// All sections are optional; see [`RunnerConfig`] for the checked form.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RunnerSection,

    /// Extra environment variables for every spawned command.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerSection {
    /// Shell interpreter used to run commands.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Arguments placed between the shell and the command string.
    #[serde(default = "default_shell_args")]
    pub shell_args: Vec<String>,

    /// How long a SIGTERM'd process gets before escalation, e.g. `"3s"`.
    #[serde(default = "default_grace_period")]
    pub grace_period: String,

    /// How long to wait for exit after each forced kill.
    #[serde(default = "default_kill_timeout")]
    pub kill_timeout: String,

    /// Forced kill attempts before a process is declared unkillable.
    #[serde(default = "default_kill_attempts")]
    pub kill_attempts: u32,

    /// Reject commands whose leading program cannot be found before spawning.
    #[serde(default = "default_preflight")]
    pub preflight: bool,

    /// Working directory for spawned commands (None = inherit).
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

fn default_shell() -> String {
    if cfg!(windows) { "cmd" } else { "sh" }.to_string()
}

fn default_shell_args() -> Vec<String> {
    vec![if cfg!(windows) { "/C" } else { "-c" }.to_string()]
}

fn default_grace_period() -> String {
    "3s".to_string()
}

fn default_kill_timeout() -> String {
    "2s".to_string()
}

fn default_kill_attempts() -> u32 {
    3
}

fn default_preflight() -> bool {
    true
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            shell_args: default_shell_args(),
            grace_period: default_grace_period(),
            kill_timeout: default_kill_timeout(),
            kill_attempts: default_kill_attempts(),
            preflight: default_preflight(),
            working_dir: None,
        }
    }
}

/// Bounds on how long `kill` may take.
///
/// Worst case is `grace_period + kill_attempts * kill_timeout`, saturating at
/// `Duration::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    pub grace_period: Duration,
    pub kill_timeout: Duration,
    pub kill_attempts: u32,
}

impl TerminationPolicy {
    pub fn worst_case(&self) -> Duration {
        self.kill_timeout
            .checked_mul(self.kill_attempts)
            .and_then(|forced| self.grace_period.checked_add(forced))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(3),
            kill_timeout: Duration::from_secs(2),
            kill_attempts: 3,
        }
    }
}

/// Validated runner configuration.
///
/// Built from [`RawConfigFile`] via `TryFrom` (see `validate.rs`), or from
/// `Default` when no config file is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub shell: String,
    pub shell_args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub preflight: bool,
    pub termination: TerminationPolicy,
}

impl RunnerConfig {
    /// Assemble a config without validation. Callers outside this module
    /// should go through `TryFrom<RawConfigFile>`.
    pub(crate) fn new_unchecked(
        section: RunnerSection,
        env: BTreeMap<String, String>,
        termination: TerminationPolicy,
    ) -> Self {
        Self {
            shell: section.shell,
            shell_args: section.shell_args,
            working_dir: section.working_dir,
            env,
            preflight: section.preflight,
            termination,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new_unchecked(
            RunnerSection::default(),
            BTreeMap::new(),
            TerminationPolicy::default(),
        )
    }
}
