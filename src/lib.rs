// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod registry;
pub mod runner;
pub mod types;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::{RunnerConfig, load_or_default, parse_duration};
use crate::registry::RunnerRegistry;
use crate::types::ExitReason;

pub use crate::errors::{LaunchError, ShellrunnerError, TerminationError};
pub use crate::registry::RunnerId;
pub use crate::runner::ProcessRunner;
pub use crate::types::{HandleId, HandleInfo, HandleState};

/// Exit code used when `--timeout` fired, matching coreutils `timeout`.
pub const EXIT_TIMEOUT: i32 = 124;
/// Exit code used when interrupted with Ctrl-C.
pub const EXIT_INTERRUPTED: i32 = 130;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - a registry with one runner slot
/// - the optional `--timeout` timer and `--until` matcher
/// - Ctrl-C handling
///
/// and streams the child's stdout to our stdout. Returns the exit code the
/// binary should exit with.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config = load_or_default(args.config.as_deref().map(Path::new))?;
    let command = args.command_line();

    let timeout = args
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| anyhow!("invalid --timeout: {e}"))?;

    let until = args
        .until
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid --until regex")?;

    if args.dry_run {
        print_dry_run(&args.runner, &config, &command);
        return Ok(0);
    }

    let mut registry = RunnerRegistry::new();
    let id = registry.get_or_insert(&args.runner, config);
    let runner = registry
        .get(id)
        .ok_or_else(|| anyhow!("runner {id} missing from registry"))?;

    let handle = runner.start(&command).await?;
    info!(runner = %runner.name(), handle = %handle.id, pid = handle.pid, "command running");

    // External timer: the only way a run times out.
    let timer = timeout.map(|after| (Instant::now() + after, runner.kill_after(handle.id, after)));

    // Ctrl-C → kill the process tree; the output loop then drains and ends.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let runner = Arc::clone(&runner);
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            interrupted.store(true, Ordering::SeqCst);
            if let Err(e) = runner.kill().await {
                error!(error = %e, "failed to kill process on Ctrl+C");
            }
        });
    }

    let mut matched = None;
    while let Some(line) = runner.next_line().await {
        println!("{line}");

        if matched.is_none() && until.as_ref().is_some_and(|re| re.is_match(&line)) {
            info!(line = %line, "--until pattern matched; stopping process");
            matched = Some(runner.spawn_kill());
        }
    }

    let stopped_on_match = matched.is_some();
    if let Some(kill) = matched {
        kill.await.context("kill task panicked")??;
    }

    // Past the deadline the timer has fired (or is about to finish firing).
    let timed_out = match timer {
        Some((deadline, timer)) if Instant::now() >= deadline => {
            timer.await.context("timer task panicked")??
        }
        Some((_, timer)) => {
            timer.abort();
            false
        }
        None => false,
    };

    let exit = runner.wait().await;
    registry.shutdown_all().await?;

    let code = if interrupted.load(Ordering::SeqCst) {
        EXIT_INTERRUPTED
    } else if timed_out {
        warn!(?timeout, "command timed out");
        EXIT_TIMEOUT
    } else if stopped_on_match {
        0
    } else {
        exit_code(exit)
    };

    debug!(?exit, code, "run finished");
    Ok(code)
}

/// Map the child's exit to our own exit code.
fn exit_code(exit: Option<ExitReason>) -> i32 {
    match exit {
        Some(ExitReason::Code(code)) => code,
        _ => 1,
    }
}

/// Simple dry-run output: print the resolved runner config and the command.
fn print_dry_run(runner: &str, config: &RunnerConfig, command: &str) {
    println!("shellrunner dry-run");
    println!("  runner = {runner}");
    println!("  shell = {} {:?}", config.shell, config.shell_args);
    if let Some(ref dir) = config.working_dir {
        println!("  working_dir = {}", dir.display());
    }
    println!("  preflight = {}", config.preflight);
    println!(
        "  termination = grace {:?}, {} x {:?} forced (worst case {:?})",
        config.termination.grace_period,
        config.termination.kill_attempts,
        config.termination.kill_timeout,
        config.termination.worst_case(),
    );
    for (key, value) in config.env.iter() {
        println!("  env {key} = {value}");
    }
    println!();
    println!("command: {command}");

    debug!("dry-run complete (no execution)");
}
