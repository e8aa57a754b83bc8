//! Event-stream framing.
//!
//! [`FrameParser`] turns arbitrarily split byte chunks into JSON frames.
//! [`FrameStream`] drives a parser from a transport chunk source with
//! cancellation.

mod error;
mod frame_stream;
mod parser;

pub use error::{FrameError, FrameResult};
pub use frame_stream::{FrameStream, StreamEvent};
pub use parser::{DATA_PREFIX, FRAME_DELIMITER, FrameParser, StreamFrame, decode_payload};
