//! Error types for frame decoding.

use thiserror::Error;

/// Errors produced while decoding a single frame segment.
///
/// None of these are fatal to a stream: the offending segment is dropped and
/// decoding continues with the next one.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Segment payload was not valid UTF-8.
    #[error("Frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Segment payload was not valid JSON.
    #[error("Invalid frame JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Payload decoded but was not a JSON object.
    #[error("Frame payload is not a JSON object: {0}")]
    NotAnObject(String),

    /// Frame object has no usable `port` key.
    #[error("Frame has no port identifier")]
    MissingPort,
}

/// Result type for frame decoding.
pub type FrameResult<T> = Result<T, FrameError>;
