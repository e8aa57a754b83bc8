//! Streamed connect consumer.
//!
//! # State machine
//!
//! ```text
//! Idle -> Requesting -> Streaming -> Completed
//!              |            |
//!              +------------+-----> Cancelled | Failed
//! ```
//!
//! A non-streamed reply goes straight from `Requesting` to `Completed`.
//! Cancellation keeps every frame merged so far and suppresses the rest.
//! There is no automatic retry.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::{StreamHandle, cancelled, port_list};
use crate::registry::{PortId, PortUpdate};
use crate::session::{Origin, SessionHandle, StreamKind, UpdateOutcome};
use crate::stream::{FrameParser, FrameStream, StreamEvent};
use crate::telemetry::ConnectState;
use crate::transport::{Backend, BoxChunkSource, ConnectReply};

/// Start a connect run for `ports`, superseding any previous run.
///
/// The new generation is registered before this returns, so from this
/// point on nothing from an older run reaches the registry.
pub fn spawn_connect(backend: Arc<dyn Backend>, session: SessionHandle, ports: Vec<PortId>) -> StreamHandle {
    let generation = session.with(|s| {
        s.cancel_run(StreamKind::Connect);
        let generation = s.begin_run(StreamKind::Connect);
        s.set_connect_state(generation, ConnectState::Requesting);
        generation
    });

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let task = tokio::spawn(run_connect(backend, session, ports, generation, cancel_rx));
    StreamHandle::new(StreamKind::Connect, generation, cancel_tx, task)
}

async fn run_connect(
    backend: Arc<dyn Backend>,
    session: SessionHandle,
    ports: Vec<PortId>,
    generation: u64,
    mut cancel: watch::Receiver<bool>,
) {
    let origin = Origin::Stream(StreamKind::Connect, generation);

    let reply = tokio::select! {
        reply = backend.connect(&ports) => reply,
        _ = cancelled(&mut cancel) => {
            debug!("Connect run {} cancelled before a response", generation);
            return;
        }
    };

    match reply {
        Ok(ConnectReply::Streamed(source)) => {
            let proceed = session.with(|s| {
                s.is_current(StreamKind::Connect, generation)
                    && s.set_connect_state(generation, ConnectState::Streaming)
            });
            if proceed {
                consume_stream(source, &session, origin, generation, &mut cancel).await;
            }
        }
        Ok(ConnectReply::Results(batch)) => {
            let names: Vec<PortId> = batch.iter().map(|(port, _)| port.clone()).collect();
            session.with(|s| {
                if s.merge_batch(origin, batch).is_some() {
                    s.log(format!("connect: {}", port_list(&names)), None);
                    s.set_connect_state(generation, ConnectState::Completed);
                }
            });
        }
        Ok(ConnectReply::Ports(reported)) => {
            finish(&session, generation, format!("connect: {}", port_list(&reported)));
        }
        Ok(ConnectReply::Other(body)) => finish(&session, generation, body.to_string()),
        Err(e) => {
            warn!("Connect request failed: {}", e);
            fail(&session, generation, format!("Connect error: {}", e));
        }
    }
}

async fn consume_stream(
    source: BoxChunkSource,
    session: &SessionHandle,
    origin: Origin,
    generation: u64,
    cancel: &mut watch::Receiver<bool>,
) {
    let mut stream = FrameStream::new(source, FrameParser::new());

    loop {
        match stream.next_event(cancel).await {
            StreamEvent::Frame(frame) => {
                let update = match PortUpdate::try_from(frame) {
                    Ok(update) => update,
                    Err(e) => {
                        warn!("Skipping connect frame: {}", e);
                        continue;
                    }
                };
                let port = update.port.clone();
                let applied = session.with(|s| {
                    let outcome = s.apply_update(origin, update);
                    if outcome != UpdateOutcome::Stale {
                        s.log(format!("connect: {}", port), Some(&port));
                    }
                    outcome
                });
                if applied == UpdateOutcome::Stale {
                    debug!("Connect run {} superseded mid-stream", generation);
                    return;
                }
            }
            StreamEvent::End => {
                debug!(
                    "Connect stream ended ({} malformed frames skipped)",
                    stream.error_count()
                );
                session.with(|s| s.set_connect_state(generation, ConnectState::Completed));
                return;
            }
            StreamEvent::Cancelled => {
                debug!("Connect run {} cancelled", generation);
                return;
            }
            StreamEvent::Failed(e) => {
                warn!("Connect stream failed: {}", e);
                fail(session, generation, format!("Connect stream error: {}", e));
                return;
            }
        }
    }
}

fn finish(session: &SessionHandle, generation: u64, message: String) {
    session.with(|s| {
        if s.is_current(StreamKind::Connect, generation) {
            s.log(message, None);
            s.set_connect_state(generation, ConnectState::Completed);
        }
    });
}

fn fail(session: &SessionHandle, generation: u64, message: String) {
    session.with(|s| {
        if s.is_current(StreamKind::Connect, generation) {
            s.log(message, None);
            s.set_connect_state(generation, ConnectState::Failed);
        }
    });
}
