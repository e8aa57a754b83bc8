//! Incremental event-stream frame parser.
//!
//! Transports hand us byte chunks with no guarantee that a chunk ends on a
//! message boundary. The parser keeps an accumulation buffer and only emits a
//! frame once its terminating blank line (`\n\n`) has arrived, so a message
//! may be split anywhere: before the `data:` prefix, inside it, or inside the
//! JSON payload. Buffering raw bytes (not text) also means a multi-byte UTF-8
//! character split across chunks is reassembled before decoding.
//!
//! # Wire format
//!
//! ```text
//! data: {"port":"COM1","signal":"-70"}\n
//! \n
//! data: {"port":"COM1","signal":"-65"}\n
//! \n
//! ```
//!
//! # Example
//!
//! ```
//! use modemsync::stream::FrameParser;
//!
//! let mut parser = FrameParser::new();
//! assert!(parser.push(b"data: {\"port\":\"CO").is_empty());
//! let frames = parser.push(b"M1\"}\n\n");
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].payload["port"], "COM1");
//! ```

use serde_json::{Map, Value};
use tracing::{trace, warn};

use super::error::{FrameError, FrameResult};

/// Message delimiter: a blank line.
pub const FRAME_DELIMITER: &[u8] = b"\n\n";

/// Prefix carried by every event-data segment.
pub const DATA_PREFIX: &str = "data:";

/// One decoded event from a streamed response.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFrame {
    /// The JSON object carried by the frame.
    pub payload: Map<String, Value>,
}

/// Incremental decoder for `data: <json>\n\n` framed streams.
///
/// A parser belongs to exactly one stream. Start a fresh parser for every
/// new response; leftover bytes of a previous stream must never leak into
/// the next one.
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Bytes received but not yet terminated by a delimiter.
    buffer: Vec<u8>,
    /// Prefix of `buffer` already searched without finding a delimiter.
    scanned: usize,
    /// Also accept segments that are a bare JSON object without `data:`.
    accept_bare_json: bool,
    /// Segments dropped because they failed to decode.
    errors: u64,
}

impl FrameParser {
    /// Create a parser that requires the `data:` prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also accept bare `{...}` segments (monitor feeds).
    #[must_use]
    pub fn with_bare_json(mut self, accept: bool) -> Self {
        self.accept_bare_json = accept;
        self
    }

    /// Feed one chunk and return every frame it completed.
    ///
    /// Malformed segments are logged and skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        // A delimiter may straddle the old tail and the new chunk.
        let mut from = self.scanned.saturating_sub(FRAME_DELIMITER.len() - 1);
        while let Some(idx) = find_delimiter(&self.buffer, from) {
            let segment: Vec<u8> = self.buffer.drain(..idx + FRAME_DELIMITER.len()).collect();
            from = 0;
            match self.decode_segment(&segment[..idx]) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => {}
                Err(e) => {
                    self.errors += 1;
                    warn!("Dropping malformed stream frame: {}", e);
                }
            }
        }
        self.scanned = self.buffer.len();
        frames
    }

    /// Signal end of stream.
    ///
    /// Returns the number of unterminated bytes that were discarded.
    pub fn finish(&mut self) -> usize {
        let leftover = self.buffer.len();
        if leftover > 0 {
            trace!("Discarding {} unterminated bytes at end of stream", leftover);
        }
        self.buffer.clear();
        self.scanned = 0;
        leftover
    }

    /// Number of bytes waiting for a delimiter.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Number of segments dropped as malformed so far.
    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.errors
    }

    fn decode_segment(&self, raw: &[u8]) -> FrameResult<Option<StreamFrame>> {
        let text = std::str::from_utf8(raw)?.trim();

        let body = if let Some(rest) = text.strip_prefix(DATA_PREFIX) {
            rest.trim()
        } else if self.accept_bare_json && text.starts_with('{') {
            text
        } else {
            // Comments, `event:` lines, keep-alives.
            if !text.is_empty() {
                trace!("Ignoring non-data segment: {}", text);
            }
            return Ok(None);
        };

        decode_payload(body).map(Some)
    }
}

/// Decode a JSON payload that must be an object.
pub fn decode_payload(body: &str) -> FrameResult<StreamFrame> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(payload) => Ok(StreamFrame { payload }),
        other => Err(FrameError::NotAnObject(other.to_string())),
    }
}

/// Index of the first delimiter at or after `from`.
fn find_delimiter(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(FRAME_DELIMITER.len())
        .position(|w| w == FRAME_DELIMITER)
        .map(|idx| idx + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT: &str = "data: {\"port\":\"COM1\",\"signal\":\"-70\"}\n\n";

    fn assert_single_com1(frames: &[StreamFrame]) {
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload["port"], "COM1");
        assert_eq!(frames[0].payload["signal"], "-70");
    }

    fn split_at(at: usize) -> Vec<StreamFrame> {
        let bytes = EVENT.as_bytes();
        let mut parser = FrameParser::new();
        let mut frames = parser.push(&bytes[..at]);
        assert!(frames.is_empty(), "no frame before the delimiter arrives");
        frames.extend(parser.push(&bytes[at..]));
        assert_eq!(parser.buffered(), 0);
        frames
    }

    #[test]
    fn test_single_chunk() {
        let mut parser = FrameParser::new();
        assert_single_com1(&parser.push(EVENT.as_bytes()));
    }

    #[test]
    fn test_split_before_prefix() {
        // Nothing at all in the first chunk is the degenerate case; split
        // on leading whitespace instead.
        let mut parser = FrameParser::new();
        assert!(parser.push(b"\n").is_empty());
        assert_single_com1(&parser.push(EVENT.as_bytes()));
    }

    #[test]
    fn test_split_inside_prefix() {
        assert_single_com1(&split_at(3)); // "dat" | "a: {..."
    }

    #[test]
    fn test_split_after_prefix() {
        assert_single_com1(&split_at(DATA_PREFIX.len()));
    }

    #[test]
    fn test_split_inside_json() {
        assert_single_com1(&split_at(20));
    }

    #[test]
    fn test_split_inside_delimiter() {
        assert_single_com1(&split_at(EVENT.len() - 1));
    }

    #[test]
    fn test_every_split_point() {
        for at in 1..EVENT.len() {
            assert_single_com1(&split_at(at));
        }
    }

    #[test]
    fn test_byte_by_byte() {
        let mut parser = FrameParser::new();
        let mut frames = Vec::new();
        for b in EVENT.as_bytes() {
            frames.extend(parser.push(std::slice::from_ref(b)));
        }
        assert_single_com1(&frames);
    }

    #[test]
    fn test_large_frame_byte_by_byte() {
        let filler = "x".repeat(64 * 1024);
        let event = format!("data: {{\"port\":\"COM1\",\"note\":\"{}\"}}\n\n", filler);
        let mut parser = FrameParser::new();
        let mut frames = Vec::new();
        for (i, b) in event.as_bytes().iter().enumerate() {
            frames.extend(parser.push(std::slice::from_ref(b)));
            if frames.is_empty() {
                assert_eq!(parser.buffered(), i + 1);
            }
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload["note"].as_str().map(str::len), Some(filler.len()));
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn test_delimiter_split_after_leftover() {
        let mut parser = FrameParser::new();
        let frames = parser.push(b"data: {\"port\":\"COM1\"}\n\ndata: {\"port\":\"COM2\"}\n");
        assert_eq!(frames.len(), 1);
        let frames = parser.push(b"\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload["port"], "COM2");
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut parser = FrameParser::new();
        let input = "data: {\"port\":\"COM1\",\"signal\":\"-70\"}\n\ndata: {\"port\":\"COM1\",\"signal\":\"-65\"}\n\n";
        let frames = parser.push(input.as_bytes());
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].payload["signal"], "-65");
    }

    #[test]
    fn test_malformed_frame_is_skipped() {
        let mut parser = FrameParser::new();
        let input = "data: {broken\n\ndata: {\"port\":\"COM2\"}\n\n";
        let frames = parser.push(input.as_bytes());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload["port"], "COM2");
        assert_eq!(parser.error_count(), 1);
    }

    #[test]
    fn test_non_object_payload_is_error() {
        let mut parser = FrameParser::new();
        assert!(parser.push(b"data: [1,2,3]\n\n").is_empty());
        assert_eq!(parser.error_count(), 1);
    }

    #[test]
    fn test_segments_without_prefix_are_ignored() {
        let mut parser = FrameParser::new();
        let frames = parser.push(b": keep-alive\n\nevent: ping\n\n{\"port\":\"COM1\"}\n\n");
        assert!(frames.is_empty());
        assert_eq!(parser.error_count(), 0);
    }

    #[test]
    fn test_bare_json_when_enabled() {
        let mut parser = FrameParser::new().with_bare_json(true);
        let frames = parser.push(b"{\"port\":\"COM1\",\"removed\":true}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload["removed"], true);
    }

    #[test]
    fn test_crlf_is_trimmed() {
        let mut parser = FrameParser::new();
        let frames = parser.push(b"data: {\"port\":\"COM1\"}\r\n\n");
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let event = "data: {\"port\":\"COM1\",\"operator\":\"Билайн\"}\n\n".as_bytes();
        // Split in the middle of the two-byte 'Б'.
        let at = event.iter().position(|&b| b >= 0x80).unwrap() + 1;
        let mut parser = FrameParser::new();
        assert!(parser.push(&event[..at]).is_empty());
        let frames = parser.push(&event[at..]);
        assert_eq!(frames[0].payload["operator"], "Билайн");
    }

    #[test]
    fn test_finish_discards_partial() {
        let mut parser = FrameParser::new();
        parser.push(b"data: {\"port\":");
        assert_eq!(parser.finish(), 14);
        assert_eq!(parser.buffered(), 0);
        // A fresh message after finish decodes cleanly.
        assert_eq!(parser.push(b"data: {\"port\":\"COM9\"}\n\n").len(), 1);
    }
}
