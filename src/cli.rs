// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `shellrunner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "shellrunner",
    version,
    about = "Run a shell command under supervision and stream its output line by line.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Shellrunner.toml` in the current working directory. A missing
    /// default file falls back to built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Kill the process (and its children) after this long, e.g. `30s`, `5m`.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Kill the process as soon as a stdout line matches this regex.
    #[arg(long, value_name = "REGEX")]
    pub until: Option<String>,

    /// Name of the runner slot in the registry.
    #[arg(long, value_name = "NAME", default_value = "default")]
    pub runner: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SHELLRUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve config, print it with the command, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// The shell command to run. Multiple words are joined with spaces.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl CliArgs {
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
