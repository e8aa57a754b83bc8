//! One-shot single-port refresh.

use tracing::warn;

use crate::registry::PortUpdate;
use crate::session::{Origin, SessionHandle, UpdateOutcome};
use crate::transport::{Backend, TransportResult};

/// Query one port's details and merge them like a connect result.
///
/// Returns whether the record changed.
pub async fn refresh_port(backend: &dyn Backend, session: &SessionHandle, port: &str) -> TransportResult<bool> {
    match backend.modem_info(port).await {
        Ok(fields) => Ok(session.with(|s| {
            let outcome = s.apply_update(Origin::Direct, PortUpdate::fields(port, fields));
            s.log(format!("refresh: {}", port), Some(port));
            matches!(outcome, UpdateOutcome::Merged { changed: true })
        })),
        Err(e) => {
            warn!("Modem info for {} failed: {}", port, e);
            session.log(format!("Refresh error for {}: {}", port, e), Some(port));
            Err(e)
        }
    }
}
