// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawConfigFile, RunnerConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** check durations
/// or paths. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it into a [`RunnerConfig`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<RunnerConfig> {
    let raw_config = load_from_path(&path)?;
    let config = RunnerConfig::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the config the CLI should use.
///
/// - An explicit path must exist and be valid.
/// - Without one, [`default_config_path`] is used if present; otherwise the
///   built-in defaults apply.
pub fn load_or_default(explicit: Option<&Path>) -> Result<RunnerConfig> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let path = default_config_path();
    if path.is_file() {
        debug!(path = ?path, "loading default config file");
        load_and_validate(&path)
    } else {
        debug!(path = ?path, "no config file found; using built-in defaults");
        Ok(RunnerConfig::default())
    }
}

/// `Shellrunner.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Shellrunner.toml")
}
