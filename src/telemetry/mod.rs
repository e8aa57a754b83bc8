//! Session events and user-visible log lines.
//!
//! # Architecture
//!
//! - **Session events** (broadcast): registry changes, log lines, the
//!   interaction lock and action indicators, for presentation layers
//! - **Remote log** (optional): every log line is also appended to the
//!   backend's log by a forwarder task
//! - **Debug logging** (tracing): development logs go to stderr via `tracing`
//!
//! # Log line format
//!
//! ```text
//! [14:32:01] connect: COM1
//! ```

mod events;
mod sink;

pub use events::{ActionIndicators, ActionState, ConnectState, LogLine, SessionEvent};
pub use sink::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_FORWARD_CAPACITY, DEFAULT_MAX_LINES, EventSink,
    spawn_log_forwarder,
};
