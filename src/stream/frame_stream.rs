//! Frames pulled from a chunk source.

use std::collections::VecDeque;

use tokio::sync::watch;
use tracing::debug;

use super::parser::{FrameParser, StreamFrame};
use crate::transport::{BoxChunkSource, TransportError};

/// Outcome of waiting for the next frame.
#[derive(Debug)]
pub enum StreamEvent {
    /// A decoded frame.
    Frame(StreamFrame),
    /// The stream ended normally.
    End,
    /// Cancellation was requested.
    Cancelled,
    /// The transport failed.
    Failed(TransportError),
}

/// A chunk source paired with its own parser.
pub struct FrameStream {
    source: BoxChunkSource,
    parser: FrameParser,
    pending: VecDeque<StreamFrame>,
    done: bool,
}

impl FrameStream {
    /// Wrap `source` with a fresh parser.
    #[must_use]
    pub fn new(source: BoxChunkSource, parser: FrameParser) -> Self {
        Self {
            source,
            parser,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Wait for the next frame, end of stream, failure or cancellation.
    ///
    /// Cancellation wins over any frame that has not been handed out yet.
    pub async fn next_event(&mut self, cancel: &mut watch::Receiver<bool>) -> StreamEvent {
        loop {
            if *cancel.borrow() {
                return StreamEvent::Cancelled;
            }
            if let Some(frame) = self.pending.pop_front() {
                return StreamEvent::Frame(frame);
            }
            if self.done {
                return StreamEvent::End;
            }

            tokio::select! {
                changed = cancel.changed() => {
                    // A dropped sender counts as cancellation.
                    if changed.is_err() {
                        return StreamEvent::Cancelled;
                    }
                }
                chunk = self.source.next_chunk() => match chunk {
                    Some(Ok(bytes)) => self.pending.extend(self.parser.push(&bytes)),
                    Some(Err(e)) => {
                        self.done = true;
                        return StreamEvent::Failed(e);
                    }
                    None => {
                        let dropped = self.parser.finish();
                        if dropped > 0 {
                            debug!("Discarded {} unterminated bytes at end of stream", dropped);
                        }
                        self.done = true;
                    }
                }
            }
        }
    }

    /// Segments the parser dropped as malformed.
    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.parser.error_count()
    }
}
