//! Newline-delimited JSON framing.
//!
//! Byte delivery on a mux stream is chunked arbitrarily, so messages carry
//! an explicit `\n` delimiter. This replaces the buffer-and-reparse scheme
//! of earlier protocol iterations, which could not separate two complete
//! messages arriving in one chunk nor tell "incomplete" from "malformed".

use scrawl_core::protocol::{ClientRequest, ServerResponse};
use scrawl_core::Result;
use tracing::warn;

/// Encode one outbound message as a delimited frame.
pub fn encode_frame(request: &ClientRequest) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(request)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Incremental decoder for one stream's inbound bytes.
///
/// Feed chunks as they arrive; complete lines come back as decoded
/// messages. A line that is not UTF-8, not JSON, or not a recognized shape
/// is dropped with a diagnostic log — a bad frame never kills the stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate a chunk and return every message completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ServerResponse> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(message) = decode_line(&line[..line.len() - 1]) {
                messages.push(message);
            }
        }
        messages
    }

    /// Flush at end-of-stream. Peers that send exactly one message per
    /// stream may omit the trailing delimiter; whatever is buffered is
    /// given one final parse.
    pub fn finish(&mut self) -> Option<ServerResponse> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(raw: &[u8]) -> Option<ServerResponse> {
    if raw.iter().all(|b| b.is_ascii_whitespace()) {
        return None;
    }
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => {
            warn!(%e, "Dropping non-UTF-8 frame");
            return None;
        }
    };
    match serde_json::from_str(text) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!(%e, frame = %text, "Dropping undecodable frame");
            None
        }
    }
}
