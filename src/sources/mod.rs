//! Input sources feeding the registry.
//!
//! - [`scan`]: one-shot port list
//! - [`info`]: one-shot single-port details
//! - [`connect`]: cancellable streamed connect operation
//! - [`monitor`]: cancellable continuous status feed
//!
//! The two stream consumers run as tokio tasks and are controlled through a
//! [`StreamHandle`]. Dropping the handle cancels the task.

pub mod connect;
pub mod info;
pub mod monitor;
pub mod scan;

pub use connect::spawn_connect;
pub use info::refresh_port;
pub use monitor::spawn_monitor;
pub use scan::scan_ports;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::registry::PortId;
use crate::session::{SessionHandle, StreamKind};

/// Control handle of one running stream consumer.
pub struct StreamHandle {
    kind: StreamKind,
    generation: u64,
    cancel_tx: watch::Sender<bool>,
    /// Taken once the task has been awaited.
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    pub(crate) fn new(
        kind: StreamKind,
        generation: u64,
        cancel_tx: watch::Sender<bool>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            kind,
            generation,
            cancel_tx,
            task: Some(task),
        }
    }

    /// Which consumer this is.
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Run generation of this consumer.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the consumer.
    ///
    /// The session's run is invalidated first, so no update from this run
    /// is applied after `stop` returns, even one already decoded.
    pub fn stop(&self, session: &SessionHandle) {
        let (kind, generation) = (self.kind, self.generation);
        session.with(|s| {
            if s.is_current(kind, generation) {
                s.cancel_run(kind);
            }
        });
        let _ = self.cancel_tx.send(true);
        debug!("Stopped {} run {}", self.kind, self.generation);
    }

    /// Wait for the task to exit on its own.
    ///
    /// Returns immediately once the task has already been awaited.
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!("{} task ended abnormally: {}", self.kind, e);
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("kind", &self.kind)
            .field("generation", &self.generation)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Resolves once cancellation is requested or the sender is gone.
pub(crate) async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// `a, b, c` for log lines.
pub(crate) fn port_list(ports: &[PortId]) -> String {
    ports.join(", ")
}
