// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{RawConfigFile, RunnerConfig, RunnerSection, TerminationPolicy};
use crate::errors::{Result, ShellrunnerError};

impl TryFrom<RawConfigFile> for RunnerConfig {
    type Error = ShellrunnerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_shell(&raw.runner)?;
        validate_env(&raw)?;
        validate_working_dir(&raw.runner)?;
        let termination = termination_policy(&raw.runner)?;
        Ok(RunnerConfig::new_unchecked(raw.runner, raw.env, termination))
    }
}

fn validate_shell(section: &RunnerSection) -> Result<()> {
    if section.shell.trim().is_empty() {
        return Err(ShellrunnerError::ConfigError(
            "[runner].shell must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_env(cfg: &RawConfigFile) -> Result<()> {
    for key in cfg.env.keys() {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(ShellrunnerError::ConfigError(format!(
                "[env] has invalid variable name {key:?}"
            )));
        }
    }
    Ok(())
}

fn validate_working_dir(section: &RunnerSection) -> Result<()> {
    if let Some(dir) = &section.working_dir {
        if !dir.is_dir() {
            return Err(ShellrunnerError::ConfigError(format!(
                "[runner].working_dir {:?} is not a directory",
                dir
            )));
        }
    }
    Ok(())
}

fn termination_policy(section: &RunnerSection) -> Result<TerminationPolicy> {
    let grace_period = positive_duration("grace_period", &section.grace_period)?;
    let kill_timeout = positive_duration("kill_timeout", &section.kill_timeout)?;

    if section.kill_attempts == 0 {
        return Err(ShellrunnerError::ConfigError(
            "[runner].kill_attempts must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(TerminationPolicy {
        grace_period,
        kill_timeout,
        kill_attempts: section.kill_attempts,
    })
}

fn positive_duration(key: &str, value: &str) -> Result<Duration> {
    let dur = parse_duration(value)
        .map_err(|e| ShellrunnerError::ConfigError(format!("[runner].{key}: {e}")))?;
    if dur.is_zero() {
        return Err(ShellrunnerError::ConfigError(format!(
            "[runner].{key} must be greater than zero"
        )));
    }
    Ok(dur)
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
