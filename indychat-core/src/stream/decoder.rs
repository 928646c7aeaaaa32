//! Incremental line framing for the response stream

use tracing::debug;

const NEWLINE: u8 = b'\n';

/// Splits arbitrarily chunked bytes into complete newline-terminated lines.
///
/// Bytes are buffered undecoded until a newline arrives. A newline byte can
/// never occur inside a multi-byte UTF-8 sequence, so decoding whole lines is
/// equivalent to stateful incremental decoding: a character split across two
/// chunks is reassembled before it is decoded.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk from the transport
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete line, without its terminating newline
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|&b| b == NEWLINE)?;
        let line: Vec<u8> = self.buffer.drain(..=end).take(end).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Lazily drain every complete line currently buffered
    pub fn lines(&mut self) -> impl Iterator<Item = String> + '_ {
        std::iter::from_fn(move || self.next_line())
    }

    /// Bytes held back waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// End of stream: discard any unterminated remainder.
    ///
    /// Returns the number of bytes dropped.
    pub fn finish(&mut self) -> usize {
        let dropped = self.buffer.len();
        if dropped > 0 {
            debug!("Discarding {} bytes of unterminated stream data", dropped);
        }
        self.buffer.clear();
        dropped
    }
}
