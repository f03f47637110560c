// tests/output_streaming.rs
mod common;
use crate::common::builders::RunnerConfigBuilder;
use crate::common::{collect_lines, init_tracing, with_timeout};

use std::error::Error;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::{Duration, timeout};

use shellrunner::ProcessRunner;
use shellrunner::runner::OutputStreamer;

type TestResult = Result<(), Box<dyn Error>>;

fn runner(name: &str) -> ProcessRunner {
    ProcessRunner::new(name, RunnerConfigBuilder::new().build())
}

#[tokio::test]
async fn lines_arrive_in_order() -> TestResult {
    init_tracing();
    let runner = runner("ordering");

    runner
        .start("i=1; while [ $i -le 2000 ]; do echo line-$i; i=$((i+1)); done")
        .await?;
    let lines = with_timeout(collect_lines(&runner)).await;

    let expected: Vec<String> = (1..=2000).map(|i| format!("line-{i}")).collect();
    assert_eq!(lines, expected);

    Ok(())
}

#[tokio::test]
async fn partial_final_line_is_delivered() -> TestResult {
    init_tracing();
    let runner = runner("partial");

    runner.start("printf 'one\\ntwo'").await?;
    let lines = with_timeout(collect_lines(&runner)).await;

    assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
    Ok(())
}

#[tokio::test]
async fn crlf_and_empty_lines() -> TestResult {
    init_tracing();
    let runner = runner("crlf");

    runner.start("printf 'a\\r\\n\\nb\\n'").await?;
    let lines = with_timeout(collect_lines(&runner)).await;

    assert_eq!(
        lines,
        vec!["a".to_string(), String::new(), "b".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn invalid_utf8_is_replaced() -> TestResult {
    init_tracing();
    let runner = runner("utf8");

    runner.start("printf 'ok\\n\\377bad\\n'").await?;
    let lines = with_timeout(collect_lines(&runner)).await;

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "ok");
    assert_eq!(lines[1], "\u{FFFD}bad");
    Ok(())
}

#[tokio::test]
async fn stderr_is_not_part_of_the_stream() -> TestResult {
    init_tracing();
    let runner = runner("stderr");

    runner.start("echo out; echo err >&2; echo out2").await?;
    let lines = with_timeout(collect_lines(&runner)).await;

    assert_eq!(lines, vec!["out".to_string(), "out2".to_string()]);
    Ok(())
}

/// The child must never stall on a full stderr pipe.
#[tokio::test]
async fn heavy_stderr_does_not_block_the_child() -> TestResult {
    init_tracing();
    let runner = runner("stderr-flood");

    runner
        .start("i=0; while [ $i -lt 5000 ]; do echo 'noise noise noise noise noise' >&2; i=$((i+1)); done; echo finished")
        .await?;
    let lines = with_timeout(collect_lines(&runner)).await;

    assert_eq!(lines, vec!["finished".to_string()]);
    Ok(())
}

/// Closing stdout is not the same as exiting.
#[tokio::test]
async fn end_of_data_waits_for_process_exit() -> TestResult {
    init_tracing();
    let runner = runner("closed-stdout");

    runner.start("echo early; exec >&-; sleep 1").await?;
    assert_eq!(with_timeout(runner.next_line()).await.as_deref(), Some("early"));

    let pending = timeout(Duration::from_millis(300), runner.next_line()).await;
    assert!(pending.is_err(), "stream must not end while the process lives");
    assert!(runner.is_running());

    assert_eq!(with_timeout(runner.next_line()).await, None);
    assert!(!runner.is_running());

    // Fused.
    assert_eq!(runner.next_line().await, None);
    assert_eq!(runner.next_line().await, None);

    Ok(())
}

#[tokio::test]
async fn no_handle_means_no_output() -> TestResult {
    init_tracing();
    let runner = runner("empty");

    assert_eq!(runner.next_line().await, None);
    assert!(!runner.is_running());
    Ok(())
}

#[tokio::test]
async fn streamer_over_in_memory_reader() -> TestResult {
    init_tracing();
    let data: &[u8] = b"alpha\nbeta\r\n\ngamma";
    let mut streamer = OutputStreamer::new(data);

    assert_eq!(streamer.next_line().await.as_deref(), Some("alpha"));
    assert_eq!(streamer.next_line().await.as_deref(), Some("beta"));
    assert_eq!(streamer.next_line().await.as_deref(), Some(""));
    assert_eq!(streamer.next_line().await.as_deref(), Some("gamma"));
    assert!(!streamer.is_finished());

    assert_eq!(streamer.next_line().await, None);
    assert!(streamer.is_finished());
    assert_eq!(streamer.next_line().await, None);
    assert_eq!(streamer.lines_read(), 4);

    Ok(())
}

/// Hands out `data`, then fails every read.
struct FailingReader {
    data: Vec<u8>,
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.data.is_empty() {
            return Poll::Ready(Err(io::Error::other("pipe exploded")));
        }
        let n = self.data.len().min(buf.remaining());
        buf.put_slice(&self.data[..n]);
        self.data.drain(..n);
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn read_error_becomes_end_of_data() -> TestResult {
    init_tracing();
    let reader = FailingReader {
        data: b"whole\nhalf".to_vec(),
    };
    let mut streamer = OutputStreamer::new(reader);

    assert_eq!(streamer.next_line().await.as_deref(), Some("whole"));
    // The partial line read before the failure is still delivered.
    assert_eq!(streamer.next_line().await.as_deref(), Some("half"));
    assert_eq!(streamer.next_line().await, None);
    assert!(streamer.is_finished());

    Ok(())
}
