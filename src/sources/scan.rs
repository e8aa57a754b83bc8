//! One-shot port scan.

use tracing::warn;

use crate::registry::PortId;
use crate::session::SessionHandle;
use crate::transport::{Backend, TransportResult};

/// Fetch the attached ports and union-merge them into the registry.
///
/// Ports known from saved state stay even when the scan no longer reports
/// them. On failure the registry is untouched and the error is logged.
pub async fn scan_ports(backend: &dyn Backend, session: &SessionHandle) -> TransportResult<Vec<PortId>> {
    match backend.scan().await {
        Ok(ports) => {
            session.with(|s| {
                s.merge_ports(&ports);
                s.log(format!("Scanned ports: {}", ports.len()), None);
            });
            Ok(ports)
        }
        Err(e) => {
            warn!("Port scan failed: {}", e);
            session.log(format!("Scan error: {}", e), None);
            Err(e)
        }
    }
}
