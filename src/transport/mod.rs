//! Backend transport.
//!
//! The engine talks to the modem backend through the [`Backend`] trait so the
//! consumers and controller never see HTTP. [`HttpBackend`] is the production
//! implementation; tests drive the engine with scripted backends.
//!
//! Streamed responses are exposed as a [`ChunkSource`]: raw body chunks with
//! no alignment to message boundaries. Framing is the job of
//! [`crate::stream::FrameParser`].

mod error;
mod http;
mod wire;

pub use error::{TransportError, TransportResult};
pub use http::{EVENT_STREAM, HttpBackend};
pub use wire::{
    LogAppendRequest, ModemInfoRequest, PortsRequest, PortsResponse, interpret_connect_body,
};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::registry::{FieldMap, PortId};

/// A source of raw body chunks from a streamed response.
#[async_trait]
pub trait ChunkSource: Send {
    /// Next chunk, `None` at end of stream.
    async fn next_chunk(&mut self) -> Option<TransportResult<Bytes>>;
}

/// Owned, type-erased chunk source.
pub type BoxChunkSource = Box<dyn ChunkSource>;

/// What the backend sent back for a connect request.
pub enum ConnectReply {
    /// An event stream of per-port updates.
    Streamed(BoxChunkSource),
    /// A batch of per-port results.
    Results(Vec<(PortId, FieldMap)>),
    /// Only a list of ports, no field data.
    Ports(Vec<PortId>),
    /// Any other JSON body.
    Other(Value),
}

impl std::fmt::Debug for ConnectReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectReply::Streamed(_) => f.write_str("Streamed(..)"),
            ConnectReply::Results(r) => f.debug_tuple("Results").field(r).finish(),
            ConnectReply::Ports(p) => f.debug_tuple("Ports").field(p).finish(),
            ConnectReply::Other(v) => f.debug_tuple("Other").field(v).finish(),
        }
    }
}

/// Operations the engine needs from the modem backend.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// List currently attached ports.
    async fn scan(&self) -> TransportResult<Vec<PortId>>;

    /// Connect to `ports`.
    async fn connect(&self, ports: &[PortId]) -> TransportResult<ConnectReply>;

    /// Disconnect `ports`; returns the ports the backend reports as handled.
    async fn disconnect(&self, ports: &[PortId]) -> TransportResult<Vec<PortId>>;

    /// Open the live monitoring stream for `ports`.
    async fn monitor(&self, ports: &[PortId]) -> TransportResult<BoxChunkSource>;

    /// Append one line to the backend's log.
    async fn append_log(&self, message: &str, port: Option<&str>) -> TransportResult<()>;

    /// Query static information for a single port.
    async fn modem_info(&self, port: &str) -> TransportResult<FieldMap>;
}
