// src/runner/launcher.rs

//! Spawning a shell command as a supervised child.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{ChildStderr, Command};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::errors::LaunchError;
use crate::runner::handle::RunnerHandle;
use crate::runner::monitor;
use crate::runner::streamer::OutputStreamer;
use crate::types::HandleId;

/// Characters that make the leading word something other than a plain
/// program name (expansions, quoting, redirections, grouping, ...).
const SHELL_META: &[char] = &[
    '$', '`', '"', '\'', '\\', '*', '?', '[', ']', '(', ')', '{', '}', '<', '>', '|', '&', ';',
    '~', '!', '#', '=',
];

/// Keywords and builtins that never resolve on `PATH`.
const SHELL_WORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "case", "esac", "for", "while", "until", "do", "done",
    "in", "function", "select", "time", ".", ":", "alias", "bg", "break", "builtin", "cd",
    "command", "continue", "declare", "echo", "eval", "exec", "exit", "export", "false", "fg",
    "getopts", "hash", "jobs", "kill", "let", "local", "printf", "pwd", "read", "readonly",
    "return", "set", "shift", "source", "test", "trap", "true", "type", "typeset", "ulimit",
    "umask", "unalias", "unset", "wait",
];

/// Checks that run before anything is touched: an empty command is always
/// rejected, the program lookup only when `preflight` is enabled.
pub fn check(command: &str, config: &RunnerConfig) -> Result<(), LaunchError> {
    if config.preflight {
        preflight(command, config)
    } else if command.trim().is_empty() {
        Err(LaunchError::EmptyCommand)
    } else {
        Ok(())
    }
}

/// Spawn `command` through the configured shell.
///
/// stdout becomes the handle's [`OutputStreamer`]; stderr is drained in the
/// background and logged at debug so the child can never block on it.
/// Callers are expected to have run [`check`] first.
pub(crate) fn launch(
    id: HandleId,
    command: &str,
    config: &RunnerConfig,
) -> Result<RunnerHandle, LaunchError> {
    let mut cmd = Command::new(&config.shell);
    cmd.args(&config.shell_args)
        .arg(command)
        .envs(&config.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = &config.working_dir {
        cmd.current_dir(dir);
    }

    // Own process group, so the whole tree can be signalled at once.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|source| spawn_error(&config.shell, source))?;

    let pid = child.id().ok_or(LaunchError::MissingPid)?;
    let stdout = child
        .stdout
        .take()
        .ok_or(LaunchError::MissingPipe { stream: "stdout" })?;

    if let Some(stderr) = child.stderr.take() {
        drain_stderr(stderr, id, pid);
    }

    info!(handle = %id, pid, cmd = %command, "process started");

    let force_kill = Arc::new(Notify::new());
    let exit_rx = monitor::spawn_reaper(child, id, pid, Arc::clone(&force_kill));
    let stdout = OutputStreamer::new(stdout).with_exit_signal(exit_rx.clone());

    Ok(RunnerHandle::new(
        id,
        pid,
        command.to_string(),
        exit_rx,
        force_kill,
        stdout,
    ))
}

/// Reject commands that cannot possibly run before anything is spawned.
///
/// Only the leading word is looked at, and only when it is a plain program
/// name. Everything else is left to the shell.
pub fn preflight(command: &str, config: &RunnerConfig) -> Result<(), LaunchError> {
    let command = command.trim();
    if command.is_empty() {
        return Err(LaunchError::EmptyCommand);
    }

    // cmd.exe has its own set of builtins; don't second-guess it.
    if cfg!(windows) {
        return Ok(());
    }

    let Some(program) = leading_program(command) else {
        return Ok(());
    };

    let cwd = match &config.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let path: Option<OsString> = config
        .env
        .get("PATH")
        .map(OsString::from)
        .or_else(|| std::env::var_os("PATH"));

    match which::which_in(program, path, &cwd) {
        Ok(resolved) => {
            debug!(program, resolved = ?resolved, "preflight resolved program");
            Ok(())
        }
        Err(e) => {
            warn!(program, error = %e, "preflight could not resolve program");
            Err(LaunchError::ExecutableNotFound {
                program: program.to_string(),
            })
        }
    }
}

/// The first word of `command` if it names a program to look up.
pub fn leading_program(command: &str) -> Option<&str> {
    let word = command.split_whitespace().next()?;
    if word.contains(SHELL_META) || SHELL_WORDS.contains(&word) {
        return None;
    }
    Some(word)
}

fn spawn_error(shell: &str, source: io::Error) -> LaunchError {
    match source.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            LaunchError::ShellUnavailable {
                shell: shell.to_string(),
                source,
            }
        }
        _ => LaunchError::Spawn {
            shell: shell.to_string(),
            source,
        },
    }
}

fn drain_stderr(stderr: ChildStderr, id: HandleId, pid: u32) {
    tokio::spawn(async move {
        let mut lines = OutputStreamer::new(stderr);
        while let Some(line) = lines.next_line().await {
            debug!(handle = %id, pid, "stderr: {}", line);
        }
    });
}
