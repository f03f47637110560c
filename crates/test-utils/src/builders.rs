#![allow(dead_code)]

use std::path::PathBuf;

use shellrunner::config::{RawConfigFile, RunnerConfig};

/// Builder for `RunnerConfig` to simplify test setup.
///
/// Defaults to short termination timeouts so kill-related tests stay fast.
pub struct RunnerConfigBuilder {
    config: RawConfigFile,
}

impl RunnerConfigBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.runner.grace_period = "500ms".to_string();
        config.runner.kill_timeout = "500ms".to_string();
        config.runner.kill_attempts = 2;
        Self { config }
    }

    pub fn shell(mut self, shell: &str) -> Self {
        self.config.runner.shell = shell.to_string();
        self
    }

    pub fn shell_args(mut self, args: &[&str]) -> Self {
        self.config.runner.shell_args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn grace_period(mut self, dur: &str) -> Self {
        self.config.runner.grace_period = dur.to_string();
        self
    }

    pub fn kill_timeout(mut self, dur: &str) -> Self {
        self.config.runner.kill_timeout = dur.to_string();
        self
    }

    pub fn kill_attempts(mut self, attempts: u32) -> Self {
        self.config.runner.kill_attempts = attempts;
        self
    }

    pub fn preflight(mut self, val: bool) -> Self {
        self.config.runner.preflight = val;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.runner.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> RunnerConfig {
        RunnerConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for RunnerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
