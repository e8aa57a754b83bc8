//! Action controller.
//!
//! Coordinates the scan, the connect consumer and the monitor consumer on
//! top of one session. Connect and disconnect are mutually exclusive modes:
//! starting one stops whatever the other started.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::registry::{PortId, SortSpec};
use crate::session::{SessionHandle, SessionResult, StreamKind};
use crate::sources::{self, StreamHandle, port_list};
use crate::telemetry::ActionIndicators;
use crate::transport::{Backend, TransportResult};

/// Orchestrates user actions against the backend and the session.
pub struct Controller {
    backend: Arc<dyn Backend>,
    session: SessionHandle,
    connect: Option<StreamHandle>,
    monitor: Option<StreamHandle>,
}

impl Controller {
    /// Create a controller over `session`.
    pub fn new(backend: Arc<dyn Backend>, session: SessionHandle) -> Self {
        Self {
            backend,
            session,
            connect: None,
            monitor: None,
        }
    }

    /// The session.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Reload the port list from the backend.
    pub async fn scan(&self) -> TransportResult<Vec<PortId>> {
        sources::scan_ports(self.backend.as_ref(), &self.session).await
    }

    /// Connect to `selected` (every known port when empty).
    ///
    /// Re-enables interaction, supersedes any in-flight connect, starts the
    /// monitor on the same ports and then the connect consumer. Returns the
    /// ports acted upon.
    pub fn connect(&mut self, selected: &[PortId]) -> Vec<PortId> {
        let ports = self.resolve(selected);

        self.stop(StreamKind::Connect);
        self.session.with(|s| {
            s.set_interaction_disabled(false);
            s.set_actions(ActionIndicators::connecting());
            s.log(format!("connect: {}", port_list(&ports)), None);
        });

        self.stop(StreamKind::Monitor);
        self.monitor = Some(sources::spawn_monitor(
            self.backend.clone(),
            self.session.clone(),
            ports.clone(),
        ));
        self.connect = Some(sources::spawn_connect(
            self.backend.clone(),
            self.session.clone(),
            ports.clone(),
        ));

        info!("Connecting {} ports", ports.len());
        ports
    }

    /// Disconnect `selected` (every known port when empty).
    ///
    /// Both consumers are stopped and interaction is disabled before the
    /// request is sent. On success the selected records are removed; with
    /// no selection the whole registry and its saved snapshot are cleared.
    /// On failure the registry is left as it was.
    pub async fn disconnect(&mut self, selected: &[PortId]) -> TransportResult<Vec<PortId>> {
        self.stop(StreamKind::Connect);
        self.stop(StreamKind::Monitor);

        let ports = self.resolve(selected);
        self.session.with(|s| {
            s.set_actions(ActionIndicators::disconnecting());
            s.set_interaction_disabled(true);
            s.log(format!("disconnect: {}", port_list(&ports)), None);
        });

        match self.backend.disconnect(&ports).await {
            Ok(reported) => {
                let removed = self.session.with(|s| {
                    if selected.is_empty() {
                        s.clear()
                    } else {
                        s.remove_ports(selected)
                    }
                });
                debug!("Disconnect removed {} records", removed);
                Ok(reported)
            }
            Err(e) => {
                warn!("Disconnect request failed: {}", e);
                self.session.log(format!("Disconnect error: {}", e), None);
                Err(e)
            }
        }
    }

    /// Re-query one port's details.
    pub async fn refresh(&self, port: &str) -> TransportResult<bool> {
        sources::refresh_port(self.backend.as_ref(), &self.session, port).await
    }

    /// Sort the display by `key`, toggling direction on repeat.
    pub fn sort_by(&self, key: &str) -> SessionResult<SortSpec> {
        self.session.with(|s| s.sort_by(key))
    }

    /// Move a column in the display order.
    pub fn move_column(&self, key: &str, to: usize) -> SessionResult<bool> {
        self.session.with(|s| s.move_column(key, to))
    }

    /// Hide or show a column.
    pub fn set_column_hidden(&self, key: &str, hidden: bool) -> SessionResult<bool> {
        self.session.with(|s| s.set_column_hidden(key, hidden))
    }

    /// Wait for the current connect run to finish on its own.
    pub async fn wait_connect(&mut self) {
        if let Some(handle) = self.connect.as_mut() {
            handle.wait().await;
        }
    }

    /// Wait for the current monitor run to finish on its own.
    pub async fn wait_monitor(&mut self) {
        if let Some(handle) = self.monitor.as_mut() {
            handle.wait().await;
        }
    }

    /// Whether a consumer of `kind` is still running.
    pub fn is_running(&self, kind: StreamKind) -> bool {
        self.slot(kind).as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop both consumers, wait for them and write the final snapshot.
    pub async fn shutdown(&mut self) -> bool {
        for kind in [StreamKind::Connect, StreamKind::Monitor] {
            if let Some(mut handle) = self.slot_mut(kind).take() {
                handle.stop(&self.session);
                handle.wait().await;
            }
        }
        let flushed = self.session.with(|s| s.flush());
        info!("Session closed");
        flushed
    }

    fn resolve(&self, selected: &[PortId]) -> Vec<PortId> {
        if selected.is_empty() {
            self.session.with(|s| s.registry().known_ids())
        } else {
            selected.to_vec()
        }
    }

    fn stop(&mut self, kind: StreamKind) {
        if let Some(handle) = self.slot_mut(kind).take() {
            handle.stop(&self.session);
        }
    }

    fn slot(&self, kind: StreamKind) -> &Option<StreamHandle> {
        match kind {
            StreamKind::Connect => &self.connect,
            StreamKind::Monitor => &self.monitor,
        }
    }

    fn slot_mut(&mut self, kind: StreamKind) -> &mut Option<StreamHandle> {
        match kind {
            StreamKind::Connect => &mut self.connect,
            StreamKind::Monitor => &mut self.monitor,
        }
    }
}
