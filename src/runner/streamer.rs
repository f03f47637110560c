// src/runner/streamer.rs

//! Line-oriented view of a child's stdout.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::types::ExitReason;

/// Lazy, ordered sequence of lines read from `R`.
///
/// - Lines are split on `\n`; a trailing `\r` is dropped as well.
/// - A final line without a delimiter is still delivered.
/// - Invalid UTF-8 is replaced, not treated as an error.
/// - Once end-of-data has been returned the streamer is fused.
///
/// When attached to a process (see [`OutputStreamer::with_exit_signal`]),
/// end-of-data additionally waits for the process to exit: a child that
/// closes its stdout and keeps running is not "finished".
///
/// `next_line` is cancel-safe: bytes already read by a dropped call are kept
/// and handed out by the next one.
#[derive(Debug)]
pub struct OutputStreamer<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    exit: Option<watch::Receiver<Option<ExitReason>>>,
    lines: u64,
    done: bool,
}

impl<R: AsyncRead + Unpin> OutputStreamer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
            exit: None,
            lines: 0,
            done: false,
        }
    }

    pub(crate) fn with_exit_signal(mut self, exit: watch::Receiver<Option<ExitReason>>) -> Self {
        self.exit = Some(exit);
        self
    }

    /// Next line, or `None` at end-of-data.
    pub async fn next_line(&mut self) -> Option<String> {
        if self.done {
            return None;
        }

        match self.reader.read_until(b'\n', &mut self.pending).await {
            Ok(_) if self.pending.is_empty() => {
                self.finish().await;
                None
            }
            Ok(_) => Some(self.take_line()),
            Err(e) => {
                warn!(
                    error = %e,
                    lines = self.lines,
                    "reading child output failed; treating as end of output"
                );
                self.done = true;
                (!self.pending.is_empty()).then(|| self.take_line())
            }
        }
    }

    /// Number of lines handed out so far.
    pub fn lines_read(&self) -> u64 {
        self.lines
    }

    pub fn is_finished(&self) -> bool {
        self.done
    }

    async fn finish(&mut self) {
        if let Some(exit) = self.exit.as_mut() {
            trace!("stdout closed; waiting for process exit");
            // An error means the reaper is gone, which only happens once the
            // child is gone too.
            let _ = exit.wait_for(Option::is_some).await;
        }
        debug!(lines = self.lines, "output stream reached end of data");
        self.done = true;
    }

    fn take_line(&mut self) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        }
        self.lines += 1;

        match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}
