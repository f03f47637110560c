// tests/config_loading.rs

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;

use shellrunner::config::{
    RunnerConfig, TerminationPolicy, load_and_validate, load_or_default, parse_duration,
};
use shellrunner::errors::ShellrunnerError;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn empty_file_gives_defaults() {
    let file = config_file("");
    let config = load_and_validate(file.path()).unwrap();

    assert_eq!(config, RunnerConfig::default());
    assert_eq!(config.termination, TerminationPolicy::default());
    assert!(config.preflight);
    assert!(config.env.is_empty());
}

#[test]
fn full_config_is_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let file = config_file(&format!(
        r#"
[runner]
shell = "bash"
shell_args = ["-lc"]
grace_period = "250ms"
kill_timeout = "1s"
kill_attempts = 5
preflight = false
working_dir = {:?}

[env]
NO_COLOR = "1"
"#,
        dir.path()
    ));

    let config = load_and_validate(file.path()).unwrap();

    assert_eq!(config.shell, "bash");
    assert_eq!(config.shell_args, vec!["-lc".to_string()]);
    assert_eq!(config.working_dir.as_deref(), Some(dir.path()));
    assert!(!config.preflight);
    assert_eq!(config.env.get("NO_COLOR").map(String::as_str), Some("1"));
    assert_eq!(
        config.termination,
        TerminationPolicy {
            grace_period: Duration::from_millis(250),
            kill_timeout: Duration::from_secs(1),
            kill_attempts: 5,
        }
    );
    assert_eq!(config.termination.worst_case(), Duration::from_millis(5250));
}

#[test]
fn invalid_duration_is_rejected() {
    let file = config_file(
        r#"
[runner]
grace_period = "soon"
"#,
    );

    match load_and_validate(file.path()) {
        Err(ShellrunnerError::ConfigError(msg)) => assert!(msg.contains("grace_period")),
        other => panic!("expected ConfigError, got: {other:?}"),
    }
}

#[test]
fn zero_duration_is_rejected() {
    let file = config_file(
        r#"
[runner]
kill_timeout = "0s"
"#,
    );

    match load_and_validate(file.path()) {
        Err(ShellrunnerError::ConfigError(msg)) => assert!(msg.contains("kill_timeout")),
        other => panic!("expected ConfigError, got: {other:?}"),
    }
}

#[test]
fn zero_kill_attempts_is_rejected() {
    let file = config_file(
        r#"
[runner]
kill_attempts = 0
"#,
    );

    match load_and_validate(file.path()) {
        Err(ShellrunnerError::ConfigError(msg)) => assert!(msg.contains("kill_attempts")),
        other => panic!("expected ConfigError, got: {other:?}"),
    }
}

#[test]
fn empty_shell_is_rejected() {
    let file = config_file(
        r#"
[runner]
shell = "  "
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(ShellrunnerError::ConfigError(_))
    ));
}

#[test]
fn bad_env_key_is_rejected() {
    let file = config_file(
        r#"
[env]
"A=B" = "x"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(ShellrunnerError::ConfigError(_))
    ));
}

#[test]
fn unknown_field_is_a_toml_error() {
    let file = config_file(
        r#"
[runner]
shel = "bash"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(ShellrunnerError::TomlError(_))
    ));
}

#[test]
fn missing_working_dir_is_rejected() {
    let file = config_file(
        r#"
[runner]
working_dir = "/definitely/not/here/4711"
"#,
    );

    match load_and_validate(file.path()) {
        Err(ShellrunnerError::ConfigError(msg)) => assert!(msg.contains("working_dir")),
        other => panic!("expected ConfigError, got: {other:?}"),
    }
}

#[test]
fn explicit_missing_file_is_an_io_error() {
    let result = load_or_default(Some(Path::new("/definitely/not/here/Shellrunner.toml")));
    assert!(matches!(result, Err(ShellrunnerError::IoError(_))));
}

#[test]
fn parse_duration_units() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration("3s"), Ok(Duration::from_secs(3)));
    assert_eq!(parse_duration(" 2m "), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert_eq!(parse_duration("0s"), Ok(Duration::ZERO));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("s").is_err());
    assert!(parse_duration("5d").is_err());
}

#[test]
fn oversized_durations_are_rejected() {
    assert!(parse_duration("9999999999999999h").is_err());
    assert!(parse_duration("999999999999999999m").is_err());
    assert!(parse_duration("99999999999999999999s").is_err());
    assert_eq!(
        parse_duration("18446744073709551615s"),
        Ok(Duration::from_secs(u64::MAX))
    );

    let file = config_file(
        r#"
[runner]
grace_period = "9999999999999999h"
"#,
    );
    match load_and_validate(file.path()) {
        Err(ShellrunnerError::ConfigError(msg)) => assert!(msg.contains("grace_period")),
        other => panic!("expected ConfigError, got: {other:?}"),
    }
}

#[test]
fn worst_case_saturates_for_huge_policies() {
    let file = config_file(
        r#"
[runner]
grace_period = "18446744073709551615s"
kill_timeout = "18446744073709551615s"
kill_attempts = 4294967295
"#,
    );
    let config = load_and_validate(file.path()).unwrap();

    assert_eq!(config.termination.worst_case(), Duration::MAX);
}
