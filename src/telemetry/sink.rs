//! Event fan-out and log history.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::events::{LogLine, SessionEvent};
use crate::transport::Backend;

/// Default broadcast capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Log lines queued for the remote forwarder before new ones are dropped.
pub const DEFAULT_FORWARD_CAPACITY: usize = 256;

/// Default number of log lines kept in memory.
pub const DEFAULT_MAX_LINES: usize = 1000;

/// Fans session events out to subscribers and keeps recent log lines.
///
/// Sends never block and never fail: with no subscriber an event is simply
/// dropped, and slow subscribers observe `Lagged` on their receiver.
pub struct EventSink {
    tx: broadcast::Sender<SessionEvent>,
    history: VecDeque<LogLine>,
    max_lines: usize,
    /// Remote log forwarder, if enabled.
    forward: Option<mpsc::Sender<LogLine>>,
}

impl EventSink {
    /// Create a sink keeping at most `max_lines` log lines.
    pub fn new(capacity: usize, max_lines: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            history: VecDeque::new(),
            max_lines,
            forward: None,
        }
    }

    /// Also hand every log line to `forward`.
    ///
    /// Lines that find the channel full are dropped.
    pub fn with_forwarder(mut self, forward: mpsc::Sender<LogLine>) -> Self {
        self.forward = Some(forward);
        self
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to every subscriber.
    pub fn emit(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            trace!("No event subscribers");
        }
    }

    /// Record, forward and emit a log line.
    pub fn log(&mut self, line: LogLine) {
        debug!("{}", line.message);

        if self.max_lines > 0 {
            while self.history.len() >= self.max_lines {
                self.history.pop_front();
            }
            self.history.push_back(line.clone());
        }

        if let Some(ref forward) = self.forward {
            match forward.try_send(line.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(dropped)) => {
                    debug!("Log forwarder is behind, dropping: {}", dropped.message);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("Log forwarder has stopped");
                    self.forward = None;
                }
            }
        }

        self.emit(SessionEvent::LogLine { line });
    }

    /// Recent log lines, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &LogLine> {
        self.history.iter()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY, DEFAULT_MAX_LINES)
    }
}

/// Append forwarded log lines to the backend until the channel closes.
///
/// Failures are logged and the line is dropped; the forwarder keeps going.
pub fn spawn_log_forwarder(
    backend: Arc<dyn Backend>,
    mut rx: mpsc::Receiver<LogLine>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if let Err(e) = backend.append_log(&line.message, line.port.as_deref()).await {
                warn!("Failed to append log line to backend: {}", e);
            }
        }
        debug!("Log forwarder stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let mut sink = EventSink::new(8, 2);
        sink.log(LogLine::now("one", None));
        sink.log(LogLine::now("two", None));
        sink.log(LogLine::now("three", None));
        let messages: Vec<&str> = sink.history().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_zero_max_lines_keeps_nothing() {
        let mut sink = EventSink::new(8, 0);
        sink.log(LogLine::now("one", None));
        assert_eq!(sink.history().count(), 0);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let sink = EventSink::default();
        sink.emit(SessionEvent::InteractionDisabledChanged { disabled: false });
    }

    #[tokio::test]
    async fn test_subscriber_sees_log_lines() {
        let mut sink = EventSink::default();
        let mut rx = sink.subscribe();
        sink.log(LogLine::now("connect: COM1", Some("COM1".to_string())));
        match rx.recv().await.unwrap() {
            SessionEvent::LogLine { line } => {
                assert_eq!(line.message, "connect: COM1");
                assert_eq!(line.port.as_deref(), Some("COM1"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forwarder_channel() {
        let (tx, mut rx) = mpsc::channel(DEFAULT_FORWARD_CAPACITY);
        let mut sink = EventSink::default().with_forwarder(tx);
        sink.log(LogLine::now("Scanned ports: 3", None));
        assert_eq!(rx.recv().await.unwrap().message, "Scanned ports: 3");

        drop(rx);
        sink.log(LogLine::now("after close", None));
        assert_eq!(sink.history().count(), 2);
    }

    #[test]
    fn test_full_forwarder_drops_lines() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut sink = EventSink::default().with_forwarder(tx);
        sink.log(LogLine::now("first", None));
        sink.log(LogLine::now("second", None));

        assert_eq!(rx.try_recv().unwrap().message, "first");
        assert!(rx.try_recv().is_err());
        assert_eq!(sink.history().count(), 2);

        // Room again once the forwarder has caught up.
        sink.log(LogLine::now("third", None));
        assert_eq!(rx.try_recv().unwrap().message, "third");
    }
}
