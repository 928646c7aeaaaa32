//! Streaming response pipeline
//!
//! The proxy answers with a newline-delimited event stream. Processing runs
//! strictly in arrival order through three stages:
//! - [`FrameDecoder`] buffers raw chunks into complete lines
//! - [`parse_line`] turns `data:` lines into [`EventRecord`](crate::protocol::EventRecord)s
//! - [`AnswerAssembler`] accumulates content and reacts to in-band signals

pub mod assembler;
pub mod decoder;
pub mod parser;

pub use assembler::{
    extract_fragment, AnswerAssembler, AssembledMessage, CallbackSink, ChannelSink, Detachable,
    StreamSink, StreamUpdate, TeardownHandle, UNKNOWN_VENDOR_ERROR,
};
pub use decoder::FrameDecoder;
pub use parser::{parse_line, DATA_PREFIX};

use crate::error::{ChatError, ChatResult};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tracing::{debug, error};

/// Run a byte stream through the decode/parse/assemble pipeline.
///
/// Returns the assembled message once the stream ends. The first fatal
/// condition (read failure, malformed record, vendor error event) stops
/// processing immediately; fragments already handed to `sink` stay delivered.
pub async fn drive<St, B, E, S>(stream: St, sink: S) -> ChatResult<AssembledMessage>
where
    St: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    S: StreamSink,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = FrameDecoder::new();
    let mut assembler = AnswerAssembler::new(sink);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            error!("Failed to read response stream: {}", e);
            ChatError::Network {
                message: format!("Error receiving response stream: {}", e),
            }
        })?;
        decoder.push(chunk.as_ref());

        for line in decoder.lines() {
            if let Some(record) = parse_line(&line)? {
                assembler.apply(record)?;
            }
        }
    }

    decoder.finish();
    let message = assembler.finish();
    debug!(
        "Stream completed with {} fragments ({} chars)",
        message.fragments,
        message.text.len()
    );
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, String>> {
        let owned: Vec<Result<Vec<u8>, String>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(owned)
    }

    #[test]
    fn test_drive_assembles_split_lines() {
        let mut received = Vec::new();
        let sink = CallbackSink::new(|c: &str| received.push(c.to_string()), |_: &str| {});
        let input = chunks(&[
            "data: {\"event\":\"message\",\"ans",
            "wer\":\"hello\"}\ndata: {\"event\":\"message\",\"answer\":\" world\"}\n",
        ]);

        let message = tokio_test::block_on(drive(input, sink)).unwrap();
        assert_eq!(message.text, "hello world");
        assert_eq!(received, vec!["hello", " world"]);
    }

    #[test]
    fn test_drive_read_failure_is_network_error() {
        let input = stream::iter(vec![
            Ok(b"data: {\"event\":\"message\",\"answer\":\"a\"}\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"data: {\"event\":\"message\",\"answer\":\"b\"}\n".to_vec()),
        ]);
        let mut received = Vec::new();
        let sink = CallbackSink::new(|c: &str| received.push(c.to_string()), |_: &str| {});

        let err = tokio_test::block_on(drive(input, sink)).unwrap_err();
        assert!(matches!(err, ChatError::Network { .. }));
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(received, vec!["a"]);
    }

    #[test]
    fn test_drive_ignores_unterminated_tail() {
        let input = chunks(&["data: {\"event\":\"message\",\"answer\":\"lost\"}"]);
        let message =
            tokio_test::block_on(drive(input, CallbackSink::new(|_: &str| {}, |_: &str| {})))
                .unwrap();
        assert_eq!(message, AssembledMessage::default());
    }
}
