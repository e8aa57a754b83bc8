//! Continuous monitor feed.
//!
//! One subscription covers a set of ports. Frames are single-port status
//! objects, or `{"port": .., "removed": true}` when a modem goes away. The
//! feed may frame them as `data:` events or as bare JSON objects; both are
//! accepted. Transport errors end the subscription and are not retried.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{StreamHandle, cancelled};
use crate::registry::{PortId, PortUpdate};
use crate::session::{Origin, SessionHandle, StreamKind, UpdateOutcome};
use crate::stream::{FrameParser, FrameStream, StreamEvent};
use crate::transport::Backend;

/// Start monitoring `ports` (empty means every known port).
///
/// Any previous monitor run is superseded before this returns.
pub fn spawn_monitor(backend: Arc<dyn Backend>, session: SessionHandle, ports: Vec<PortId>) -> StreamHandle {
    let (generation, ports) = session.with(|s| {
        let ports = if ports.is_empty() {
            s.registry().known_ids()
        } else {
            ports
        };
        (s.begin_run(StreamKind::Monitor), ports)
    });

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let task = tokio::spawn(run_monitor(backend, session, ports, generation, cancel_rx));
    StreamHandle::new(StreamKind::Monitor, generation, cancel_tx, task)
}

async fn run_monitor(
    backend: Arc<dyn Backend>,
    session: SessionHandle,
    ports: Vec<PortId>,
    generation: u64,
    mut cancel: watch::Receiver<bool>,
) {
    let origin = Origin::Stream(StreamKind::Monitor, generation);

    let source = tokio::select! {
        source = backend.monitor(&ports) => source,
        _ = cancelled(&mut cancel) => return,
    };
    let source = match source {
        Ok(source) => source,
        Err(e) => {
            warn!("Monitor subscription failed: {}", e);
            session.with(|s| {
                if s.is_current(StreamKind::Monitor, generation) {
                    s.log(format!("Monitor error: {}", e), None);
                }
            });
            return;
        }
    };

    info!("Monitoring {} ports", ports.len());
    let mut stream = FrameStream::new(source, FrameParser::new().with_bare_json(true));

    loop {
        match stream.next_event(&mut cancel).await {
            StreamEvent::Frame(frame) => {
                let update = match PortUpdate::try_from(frame) {
                    Ok(update) => update,
                    Err(e) => {
                        warn!("Skipping monitor frame: {}", e);
                        continue;
                    }
                };
                let port = update.port.clone();
                let outcome = session.with(|s| {
                    let outcome = s.apply_update(origin, update);
                    if outcome == (UpdateOutcome::Removed { existed: true }) {
                        s.log(format!("Port removed: {}", port), Some(&port));
                    }
                    outcome
                });
                if outcome == UpdateOutcome::Stale {
                    return;
                }
            }
            StreamEvent::End => {
                debug!("Monitor stream ended");
                return;
            }
            StreamEvent::Cancelled => {
                debug!("Monitor run {} cancelled", generation);
                return;
            }
            StreamEvent::Failed(e) => {
                warn!("Monitor stream failed: {}", e);
                session.with(|s| {
                    if s.is_current(StreamKind::Monitor, generation) {
                        s.log(format!("Monitor error: {}", e), None);
                    }
                });
                return;
            }
        }
    }
}
