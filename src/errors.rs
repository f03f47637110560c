// src/errors.rs

//! Crate-wide error types.
//!
//! - [`LaunchError`] is raised synchronously by `ProcessRunner::start`.
//! - [`TerminationError`] is fatal: the child could not be confirmed dead and
//!   the orchestrator has to step in.
//! - Stream read failures never show up here; they end the stream instead.

use std::io;

use thiserror::Error;

/// Failure to get a new child process running.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("command is empty")]
    EmptyCommand,

    #[error("executable not found: {program}")]
    ExecutableNotFound { program: String },

    #[error("shell '{shell}' is not available: {source}")]
    ShellUnavailable {
        shell: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn '{shell}': {source}")]
    Spawn {
        shell: String,
        #[source]
        source: io::Error,
    },

    #[error("spawned child did not report a PID")]
    MissingPid,

    #[error("child {stream} pipe was not captured")]
    MissingPipe { stream: &'static str },
}

/// Failure to confirm that a child process has exited.
#[derive(Error, Debug)]
pub enum TerminationError {
    #[error("process {pid} did not exit after {attempts} forced kill attempt(s)")]
    Unkillable { pid: u32, attempts: u32 },
}

#[derive(Error, Debug)]
pub enum ShellrunnerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    #[error("Termination error: {0}")]
    Termination(#[from] TerminationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShellrunnerError {
    /// True when a child process may have leaked and needs manual attention.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellrunnerError::Termination(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ShellrunnerError>;
