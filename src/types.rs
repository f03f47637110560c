use std::fmt;
use std::process::ExitStatus;
use std::time::SystemTime;

/// Identifier of one spawned child within a runner.
///
/// Ids are handed out in increasing order, so a handle id also tells you
/// which of two processes was started later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a runner's handle.
///
/// - `Idle`: the runner has no handle at all.
/// - `Running`: the OS has not reported an exit yet.
/// - `Exited`: the process terminated on its own.
/// - `Killed`: the process was terminated by the runner.
/// - `Unkillable`: termination was escalated and still not confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Idle,
    Running,
    Exited,
    Killed,
    Unkillable,
}

impl HandleState {
    /// `Running` and `Unkillable` both mean a live OS process may exist.
    pub fn may_be_alive(self) -> bool {
        matches!(self, HandleState::Running | HandleState::Unkillable)
    }
}

/// How a child process ended, as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Normal exit with the given code.
    Code(i32),
    /// Terminated by a signal (unix only).
    Signal(i32),
    /// Waiting on the child failed; the process is gone but the status is lost.
    Unknown,
}

impl ExitReason {
    pub fn success(self) -> bool {
        matches!(self, ExitReason::Code(0))
    }

    pub fn code(self) -> Option<i32> {
        match self {
            ExitReason::Code(c) => Some(c),
            _ => None,
        }
    }
}

impl From<ExitStatus> for ExitReason {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitReason::Code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return ExitReason::Signal(sig);
            }
        }

        ExitReason::Unknown
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Code(c) => write!(f, "exit code {c}"),
            ExitReason::Signal(s) => write!(f, "signal {s}"),
            ExitReason::Unknown => write!(f, "unknown exit status"),
        }
    }
}

/// Snapshot of a runner handle, safe to hand to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleInfo {
    pub id: HandleId,
    pub pid: u32,
    pub command: String,
    pub started_at: SystemTime,
    pub state: HandleState,
    pub exit: Option<ExitReason>,
}
