// src/runner/monitor.rs

//! Process liveness.
//!
//! Every spawned child is moved into a reaper task that waits on it and
//! publishes the OS exit status on a `watch` channel. Liveness is read from
//! that channel and nothing else; in particular the stdout stream is never
//! consulted, so an idle process is still reported as running.

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{Notify, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::runner::handle::RunnerHandle;
use crate::types::{ExitReason, HandleId};

/// Move `child` into a background task that reaps it.
///
/// - `force_kill` makes the task kill the child in-process (used as the last
///   resort of termination, and as the only option on non-unix targets).
/// - The returned receiver flips from `None` to `Some` exactly once.
pub(crate) fn spawn_reaper(
    mut child: Child,
    id: HandleId,
    pid: u32,
    force_kill: Arc<Notify>,
) -> watch::Receiver<Option<ExitReason>> {
    let (exit_tx, exit_rx) = watch::channel(None);

    tokio::spawn(async move {
        let reason = loop {
            tokio::select! {
                status = child.wait() => {
                    break match status {
                        Ok(status) => ExitReason::from(status),
                        Err(e) => {
                            error!(handle = %id, pid, error = %e, "waiting on child process failed");
                            ExitReason::Unknown
                        }
                    };
                }

                _ = force_kill.notified() => {
                    debug!(handle = %id, pid, "force kill requested; killing child");
                    if let Err(e) = child.start_kill() {
                        warn!(handle = %id, pid, error = %e, "failed to kill child process");
                    }
                }
            }
        };

        info!(handle = %id, pid, exit = %reason, "process exited");
        exit_tx.send_replace(Some(reason));
    });

    exit_rx
}

/// True until the OS has reported the child's exit.
pub(crate) fn is_alive(handle: &RunnerHandle) -> bool {
    handle.exit().is_none()
}

/// Wait for the child to exit, optionally bounded by `limit`.
///
/// Returns `None` only when `limit` elapsed first. If the reaper went away
/// without reporting (runtime shutdown, where `kill_on_drop` takes the child
/// down with it) the exit is reported as [`ExitReason::Unknown`].
pub(crate) async fn wait_for_exit(
    handle: &RunnerHandle,
    limit: Option<Duration>,
) -> Option<ExitReason> {
    let mut rx = handle.exit_receiver();
    let wait = async move {
        let exit = match rx.wait_for(Option::is_some).await {
            Ok(exit) => *exit,
            Err(_) => Some(ExitReason::Unknown),
        };
        exit.unwrap_or(ExitReason::Unknown)
    };

    match limit {
        Some(limit) => timeout(limit, wait).await.ok(),
        None => Some(wait.await),
    }
}
