// src/registry.rs

//! Orchestrator-side arena of runners.
//!
//! Each runner slot (per target, per tool invocation, ...) gets a stable
//! [`RunnerId`]. Runners never share process state; the registry only hands
//! out `Arc`s so callers on different tasks can drive the same slot.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::RunnerConfig;
use crate::errors::{Result, ShellrunnerError};
use crate::runner::ProcessRunner;

/// Index of a runner inside a [`RunnerRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunnerId(usize);

impl fmt::Display for RunnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runner-{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct RunnerRegistry {
    runners: Vec<Arc<ProcessRunner>>,
    by_name: HashMap<String, RunnerId>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new runner under `name`. Names are unique.
    pub fn insert(&mut self, name: impl Into<String>, config: RunnerConfig) -> Result<RunnerId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ShellrunnerError::ConfigError(format!(
                "runner '{name}' is already registered"
            )));
        }
        Ok(self.push(name, config))
    }

    /// Id of the runner called `name`, registering it with `config` first if
    /// it doesn't exist yet.
    pub fn get_or_insert(&mut self, name: &str, config: RunnerConfig) -> RunnerId {
        match self.lookup(name) {
            Some(id) => id,
            None => self.push(name.to_string(), config),
        }
    }

    pub fn get(&self, id: RunnerId) -> Option<Arc<ProcessRunner>> {
        self.runners.get(id.0).cloned()
    }

    pub fn lookup(&self, name: &str) -> Option<RunnerId> {
        self.by_name.get(name).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = RunnerId> + '_ {
        (0..self.runners.len()).map(RunnerId)
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Shut down every runner.
    ///
    /// All runners are attempted even if some fail. Afterwards the first fatal
    /// failure is returned, or else the first failure of any kind.
    pub async fn shutdown_all(&self) -> Result<()> {
        let mut first_err: Option<ShellrunnerError> = None;

        for runner in &self.runners {
            if let Err(e) = runner.shutdown().await {
                error!(
                    runner = %runner.name(),
                    error = %e,
                    fatal = e.is_fatal(),
                    "failed to shut down runner"
                );
                let replace = match &first_err {
                    None => true,
                    Some(prev) => e.is_fatal() && !prev.is_fatal(),
                };
                if replace {
                    first_err = Some(e);
                }
            }
        }

        info!(runners = self.runners.len(), "all runners shut down");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn push(&mut self, name: String, config: RunnerConfig) -> RunnerId {
        let id = RunnerId(self.runners.len());
        self.runners
            .push(Arc::new(ProcessRunner::new(name.clone(), config)));
        debug!(runner = %name, %id, "registered runner");
        self.by_name.insert(name, id);
        id
    }
}
