// src/runner/terminator.rs

//! Terminating a child and everything it spawned.
//!
//! Escalation ladder:
//! 1. graceful signal to the process group, wait `grace_period`
//! 2. forced kill of the group and of the child itself, wait `kill_timeout`,
//!    repeated `kill_attempts` times
//! 3. give up: the handle becomes `Unkillable` and the error is fatal

use tracing::{debug, error, info, warn};

use crate::config::TerminationPolicy;
use crate::errors::TerminationError;
use crate::runner::handle::RunnerHandle;
use crate::runner::monitor::wait_for_exit;
use crate::types::HandleState;

/// Drive `handle` to `Killed`.
///
/// An `Exited` handle only gets its process group swept, since background
/// children may outlive the shell and keep stdout open. `Killed` is a no-op.
/// Otherwise returns only once the OS has confirmed the exit, or the ladder
/// is exhausted.
pub(crate) async fn terminate(
    handle: &RunnerHandle,
    policy: &TerminationPolicy,
) -> Result<(), TerminationError> {
    let state = handle.state();
    if state == HandleState::Exited {
        debug!(handle = %handle.id(), pid = handle.pid(), "leader already exited; sweeping its group");
        sys::kill_group(handle.pid()).await;
        return Ok(());
    }
    if !state.may_be_alive() {
        debug!(handle = %handle.id(), ?state, "nothing to terminate");
        return Ok(());
    }

    let id = handle.id();
    let pid = handle.pid();
    info!(handle = %id, pid, "terminating process tree");

    sys::terminate_group(pid).await;
    if wait_for_exit(handle, Some(policy.grace_period)).await.is_some() {
        confirm_killed(handle).await;
        return Ok(());
    }

    for attempt in 1..=policy.kill_attempts {
        warn!(
            handle = %id,
            pid,
            attempt,
            "process still alive; forcing kill"
        );
        sys::kill_group(pid).await;
        handle.request_force_kill();

        if wait_for_exit(handle, Some(policy.kill_timeout)).await.is_some() {
            confirm_killed(handle).await;
            return Ok(());
        }
    }

    handle.mark(HandleState::Unkillable);
    error!(
        handle = %id,
        pid,
        attempts = policy.kill_attempts,
        "process could not be terminated; manual intervention required"
    );
    Err(TerminationError::Unkillable {
        pid,
        attempts: policy.kill_attempts,
    })
}

/// Synchronous last-chance kill, for contexts that cannot await (`Drop`).
pub(crate) fn kill_now(handle: &RunnerHandle) {
    sys::kill_group_now(handle.pid());
    handle.request_force_kill();
}

async fn confirm_killed(handle: &RunnerHandle) {
    // The leader is gone; take down anything left in its group.
    sys::kill_group(handle.pid()).await;
    handle.mark(HandleState::Killed);
    info!(
        handle = %handle.id(),
        pid = handle.pid(),
        exit = ?handle.exit(),
        "process terminated"
    );
}

#[cfg(unix)]
mod sys {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;
    use tracing::{debug, warn};

    pub(super) async fn terminate_group(pid: u32) {
        signal_group(pid, Signal::SIGTERM);
    }

    pub(super) async fn kill_group(pid: u32) {
        signal_group(pid, Signal::SIGKILL);
    }

    pub(super) fn kill_group_now(pid: u32) {
        signal_group(pid, Signal::SIGKILL);
    }

    /// Children are spawned as leaders of their own group, so the group id
    /// equals the leader's pid.
    fn signal_group(pid: u32, signal: Signal) {
        let Ok(raw) = i32::try_from(pid) else {
            warn!(pid, "pid out of range; not signalling");
            return;
        };

        match killpg(Pid::from_raw(raw), signal) {
            Ok(()) => debug!(pid, ?signal, "signalled process group"),
            Err(Errno::ESRCH) => debug!(pid, ?signal, "process group already gone"),
            Err(e) => warn!(pid, ?signal, error = %e, "failed to signal process group"),
        }
    }
}

#[cfg(not(unix))]
mod sys {
    use std::process::Stdio;

    use tokio::process::Command;
    use tracing::{debug, warn};

    pub(super) async fn terminate_group(pid: u32) {
        taskkill(pid, false).await;
    }

    pub(super) async fn kill_group(pid: u32) {
        taskkill(pid, true).await;
    }

    pub(super) fn kill_group_now(_pid: u32) {
        // Covered by the reaper's force kill plus `kill_on_drop`.
    }

    async fn taskkill(pid: u32, force: bool) {
        let pid_arg = pid.to_string();
        let mut cmd = Command::new("taskkill");
        cmd.args(["/pid", pid_arg.as_str(), "/t"]);
        if force {
            cmd.arg("/f");
        }

        let status = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => debug!(pid, force, ?status, "taskkill finished"),
            Err(e) => warn!(pid, force, error = %e, "failed to run taskkill"),
        }
    }
}
