// tests/streamer_properties.rs
use proptest::prelude::*;
use shellrunner::runner::OutputStreamer;

fn read_all(data: Vec<u8>) -> Vec<String> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    rt.block_on(async move {
        let mut streamer = OutputStreamer::new(data.as_slice());
        let mut lines = Vec::new();
        while let Some(line) = streamer.next_line().await {
            lines.push(line);
        }
        lines
    })
}

proptest! {
    /// Whatever the line contents, the streamer gives back exactly the lines
    /// that were written, in order.
    #[test]
    fn lines_survive_the_stream(
        lines in proptest::collection::vec("[^\r\n]{0,40}", 0..30),
        trailing_newline in any::<bool>(),
        crlf in any::<bool>(),
    ) {
        let sep = if crlf { "\r\n" } else { "\n" };
        let mut data = lines.join(sep);
        if trailing_newline && !lines.is_empty() {
            data.push_str(sep);
        }

        // An empty last line without a terminator produces no bytes at all.
        let mut expected = lines.clone();
        if !trailing_newline && expected.last().is_some_and(String::is_empty) {
            expected.pop();
        }

        prop_assert_eq!(read_all(data.into_bytes()), expected);
    }

    #[test]
    fn arbitrary_bytes_never_lose_newlines(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let newlines = bytes.iter().filter(|&&b| b == b'\n').count();
        let unterminated = bytes.last().is_some_and(|&b| b != b'\n');

        let lines = read_all(bytes);
        prop_assert_eq!(lines.len(), newlines + usize::from(unterminated));
    }
}
