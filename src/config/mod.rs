// src/config/mod.rs

//! Configuration loading and validation for shellrunner.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Turn the raw model into a checked [`RunnerConfig`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{RawConfigFile, RunnerConfig, RunnerSection, TerminationPolicy};
pub use validate::parse_duration;
