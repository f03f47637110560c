// src/runner/handle.rs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use tokio::process::ChildStdout;
use tokio::sync::{Mutex as AsyncMutex, Notify, watch};

use crate::runner::streamer::OutputStreamer;
use crate::types::{ExitReason, HandleId, HandleInfo, HandleState};

/// One spawned child process, owned by a `ProcessRunner`.
///
/// The OS child itself lives in the reaper task (see `monitor`); this struct
/// only holds the channels that talk to it plus the stdout stream.
pub(crate) struct RunnerHandle {
    id: HandleId,
    pid: u32,
    command: String,
    started_at: SystemTime,
    /// Only `Running`, `Killed` or `Unkillable` are ever stored; `Exited` is
    /// derived from the exit channel.
    marked: Mutex<HandleState>,
    exit_rx: watch::Receiver<Option<ExitReason>>,
    force_kill: Arc<Notify>,
    stdout: AsyncMutex<OutputStreamer<ChildStdout>>,
}

impl RunnerHandle {
    pub(crate) fn new(
        id: HandleId,
        pid: u32,
        command: String,
        exit_rx: watch::Receiver<Option<ExitReason>>,
        force_kill: Arc<Notify>,
        stdout: OutputStreamer<ChildStdout>,
    ) -> Self {
        Self {
            id,
            pid,
            command,
            started_at: SystemTime::now(),
            marked: Mutex::new(HandleState::Running),
            exit_rx,
            force_kill,
            stdout: AsyncMutex::new(stdout),
        }
    }

    pub(crate) fn id(&self) -> HandleId {
        self.id
    }

    pub(crate) fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit reported by the OS, if any.
    pub(crate) fn exit(&self) -> Option<ExitReason> {
        *self.exit_rx.borrow()
    }

    pub(crate) fn exit_receiver(&self) -> watch::Receiver<Option<ExitReason>> {
        self.exit_rx.clone()
    }

    pub(crate) fn state(&self) -> HandleState {
        let marked = *self.lock_marked();
        match (marked, self.exit()) {
            (HandleState::Running, Some(_)) => HandleState::Exited,
            // Escalation gave up, but the process died later on.
            (HandleState::Unkillable, Some(_)) => HandleState::Killed,
            (state, _) => state,
        }
    }

    pub(crate) fn mark(&self, state: HandleState) {
        *self.lock_marked() = state;
    }

    /// Ask the reaper to kill the child directly.
    pub(crate) fn request_force_kill(&self) {
        self.force_kill.notify_one();
    }

    /// Next stdout line; callers are serialized on the stream lock.
    pub(crate) async fn next_line(&self) -> Option<String> {
        self.stdout.lock().await.next_line().await
    }

    pub(crate) fn info(&self) -> HandleInfo {
        HandleInfo {
            id: self.id,
            pid: self.pid,
            command: self.command.clone(),
            started_at: self.started_at,
            state: self.state(),
            exit: self.exit(),
        }
    }

    fn lock_marked(&self) -> MutexGuard<'_, HandleState> {
        self.marked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
