// src/runner/mod.rs

//! Supervision of a single external process.
//!
//! - [`launcher`] spawns the shell command and wires up its pipes.
//! - [`monitor`] owns the OS child and answers "is it still alive?".
//! - [`streamer`] turns stdout into an ordered sequence of lines.
//! - [`terminator`] takes the process tree down with SIGTERM → SIGKILL.
//!
//! [`ProcessRunner`] ties them together and guarantees that a runner never
//! has more than one live child.

mod handle;
pub mod launcher;
mod monitor;
pub mod streamer;
mod terminator;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::errors::Result;
use crate::types::{ExitReason, HandleId, HandleInfo, HandleState};

use self::handle::RunnerHandle;

pub use self::streamer::OutputStreamer;

/// A slot that runs at most one shell command at a time.
///
/// - `start` and `kill` are serialized against each other.
/// - `is_running`, `state` and `next_line` never wait for a `start`/`kill`
///   in progress.
/// - `next_line` is meant for a single consumer; concurrent callers are
///   serialized per handle.
pub struct ProcessRunner {
    name: String,
    config: RunnerConfig,
    /// Held for the whole of `start` / `kill`.
    control: AsyncMutex<()>,
    /// Never held across an await.
    current: Mutex<Option<Arc<RunnerHandle>>>,
    next_id: AtomicU64,
}

impl fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ProcessRunner {
    pub fn new(name: impl Into<String>, config: RunnerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            control: AsyncMutex::new(()),
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Start `command`, replacing whatever this runner was running.
    ///
    /// - A command rejected by the launch checks leaves the runner untouched.
    /// - Otherwise a live predecessor is terminated and its exit confirmed
    ///   before the new process is spawned; if that fails the error is
    ///   returned and nothing new is started.
    /// - If the spawn itself fails the runner ends up with no handle at all.
    pub async fn start(&self, command: &str) -> Result<HandleInfo> {
        if let Err(e) = launcher::check(command, &self.config) {
            warn!(runner = %self.name, cmd = %command, error = %e, "command rejected");
            return Err(e.into());
        }

        let _control = self.control.lock().await;

        if let Some(previous) = self.current_handle() {
            if previous.state().may_be_alive() {
                info!(
                    runner = %self.name,
                    previous = %previous.id(),
                    pid = previous.pid(),
                    "stopping previous process before start"
                );
            }
            // Also sweeps leftovers of a predecessor that exited on its own.
            terminator::terminate(&previous, &self.config.termination).await?;
        }
        self.replace_current(None);

        let id = HandleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = match launcher::launch(id, command, &self.config) {
            Ok(handle) => Arc::new(handle),
            Err(e) => {
                warn!(runner = %self.name, cmd = %command, error = %e, "launch failed");
                return Err(e.into());
            }
        };

        let info = handle.info();
        self.replace_current(Some(handle));
        Ok(info)
    }

    /// Whether the OS still reports the current child as alive.
    ///
    /// Pending or missing output has no influence on the answer.
    pub fn is_running(&self) -> bool {
        self.current_handle()
            .is_some_and(|handle| monitor::is_alive(&handle))
    }

    /// Next line of the current child's stdout.
    ///
    /// Blocks until a line is available or the stream ends; `None` means the
    /// process has exited and everything it wrote has been handed out (or
    /// that there is no process at all).
    pub async fn next_line(&self) -> Option<String> {
        let handle = self.current_handle()?;
        handle.next_line().await
    }

    /// Terminate the current child, if any. Idempotent.
    pub async fn kill(&self) -> Result<()> {
        let _control = self.control.lock().await;
        match self.current_handle() {
            Some(handle) => Ok(terminator::terminate(&handle, &self.config.termination).await?),
            None => Ok(()),
        }
    }

    /// Like [`kill`](Self::kill), but only if `id` is still the current
    /// handle. Returns whether a live process was actually terminated.
    pub async fn kill_handle(&self, id: HandleId) -> Result<bool> {
        let _control = self.control.lock().await;
        match self.current_handle() {
            Some(handle) if handle.id() == id => {
                let alive = handle.state().may_be_alive();
                terminator::terminate(&handle, &self.config.termination).await?;
                Ok(alive)
            }
            _ => {
                debug!(runner = %self.name, handle = %id, "handle no longer current; not killing");
                Ok(false)
            }
        }
    }

    /// Run [`kill`](Self::kill) in the background.
    pub fn spawn_kill(self: &Arc<Self>) -> JoinHandle<Result<()>> {
        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.kill().await })
    }

    /// Kill handle `id` once `delay` has elapsed, unless it has been replaced
    /// by then. Dropping the runner before the timer fires cancels it.
    pub fn kill_after(self: &Arc<Self>, id: HandleId, delay: Duration) -> JoinHandle<Result<bool>> {
        let runner = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match runner.upgrade() {
                Some(runner) => {
                    info!(runner = %runner.name, handle = %id, ?delay, "timer expired");
                    runner.kill_handle(id).await
                }
                None => Ok(false),
            }
        })
    }

    /// Wait for the current child to exit on its own.
    pub async fn wait(&self) -> Option<ExitReason> {
        let handle = self.current_handle()?;
        monitor::wait_for_exit(&handle, None).await
    }

    pub fn state(&self) -> HandleState {
        self.current_handle()
            .map_or(HandleState::Idle, |handle| handle.state())
    }

    pub fn handle_info(&self) -> Option<HandleInfo> {
        self.current_handle().map(|handle| handle.info())
    }

    /// Kill the current child and discard its handle.
    pub async fn shutdown(&self) -> Result<()> {
        let _control = self.control.lock().await;
        if let Some(handle) = self.current_handle() {
            terminator::terminate(&handle, &self.config.termination).await?;
        }
        self.replace_current(None);
        debug!(runner = %self.name, "runner shut down");
        Ok(())
    }

    /// Forget an `Unkillable` handle, e.g. after someone dealt with the
    /// process by hand. Returns the discarded handle.
    pub async fn abandon(&self) -> Option<HandleInfo> {
        let _control = self.control.lock().await;
        let handle = self.current_handle()?;
        if handle.state() != HandleState::Unkillable {
            return None;
        }

        warn!(runner = %self.name, handle = %handle.id(), pid = handle.pid(), "abandoning unkillable process");
        self.replace_current(None);
        Some(handle.info())
    }

    fn current_handle(&self) -> Option<Arc<RunnerHandle>> {
        self.lock_current().clone()
    }

    fn replace_current(&self, handle: Option<Arc<RunnerHandle>>) {
        *self.lock_current() = handle;
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<Arc<RunnerHandle>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ProcessRunner {
    fn drop(&mut self) {
        let current = self
            .current
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = current {
            if monitor::is_alive(&handle) {
                warn!(runner = %self.name, pid = handle.pid(), "runner dropped with live process; killing");
                terminator::kill_now(&handle);
            }
        }
    }
}
