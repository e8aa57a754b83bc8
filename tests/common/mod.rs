//! Scripted backend shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use modemsync::persist::Persistence;
use modemsync::registry::{FieldMap, PortId};
use modemsync::session::{Session, SessionHandle};
use modemsync::telemetry::EventSink;
use modemsync::transport::{
    Backend, BoxChunkSource, ChunkSource, ConnectReply, TransportError, TransportResult,
};

/// Chunk source fed from the test through an unbounded channel.
///
/// Dropping the sender ends the stream.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<TransportResult<Bytes>>,
}

#[async_trait]
impl ChunkSource for ChannelSource {
    async fn next_chunk(&mut self) -> Option<TransportResult<Bytes>> {
        self.rx.recv().await
    }
}

/// Test-side end of a [`ChannelSource`].
pub struct Feed {
    tx: mpsc::UnboundedSender<TransportResult<Bytes>>,
}

impl Feed {
    pub fn send(&self, chunk: &str) {
        let _ = self.tx.send(Ok(Bytes::copy_from_slice(chunk.as_bytes())));
    }

    pub fn frame(&self, json: &str) {
        self.send(&format!("data: {}\n\n", json));
    }

    pub fn fail(&self, message: &str) {
        let _ = self.tx.send(Err(TransportError::Body(message.to_string())));
    }
}

pub fn feed() -> (Feed, BoxChunkSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Feed { tx }, Box::new(ChannelSource { rx }))
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Scan,
    Connect(Vec<PortId>),
    Disconnect(Vec<PortId>),
    Monitor(Vec<PortId>),
    ModemInfo(String),
}

fn failure(call: &str) -> TransportError {
    TransportError::Request {
        url: format!("http://backend.test/{}", call),
        message: "connection refused".to_string(),
    }
}

/// Backend answering from queued, per-call scripts.
///
/// Unscripted connect and monitor calls get a stream that never produces
/// anything; unscripted scan, disconnect and info calls fail.
#[derive(Default)]
pub struct ScriptedBackend {
    calls: Mutex<Vec<Call>>,
    scans: Mutex<VecDeque<Option<Vec<PortId>>>>,
    connects: Mutex<VecDeque<Option<ConnectReply>>>,
    monitors: Mutex<VecDeque<BoxChunkSource>>,
    disconnects: Mutex<VecDeque<Option<Vec<PortId>>>>,
    infos: Mutex<VecDeque<Option<FieldMap>>>,
    appended: Mutex<Vec<(String, Option<String>)>>,
    idle: Mutex<Vec<Feed>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_scan(&self, ports: &[&str]) {
        let ports = ports.iter().map(|p| p.to_string()).collect();
        self.scans.lock().unwrap().push_back(Some(ports));
    }

    pub fn fail_scan(&self) {
        self.scans.lock().unwrap().push_back(None);
    }

    pub fn on_connect(&self, reply: ConnectReply) {
        self.connects.lock().unwrap().push_back(Some(reply));
    }

    /// Queue a streamed connect reply and return its feed.
    pub fn on_connect_stream(&self) -> Feed {
        let (feed, source) = feed();
        self.on_connect(ConnectReply::Streamed(source));
        feed
    }

    pub fn fail_connect(&self) {
        self.connects.lock().unwrap().push_back(None);
    }

    /// Queue a monitor subscription and return its feed.
    pub fn on_monitor(&self) -> Feed {
        let (feed, source) = feed();
        self.monitors.lock().unwrap().push_back(source);
        feed
    }

    pub fn on_disconnect(&self, ports: &[&str]) {
        let ports = ports.iter().map(|p| p.to_string()).collect();
        self.disconnects.lock().unwrap().push_back(Some(ports));
    }

    pub fn fail_disconnect(&self) {
        self.disconnects.lock().unwrap().push_back(None);
    }

    pub fn on_modem_info(&self, fields: FieldMap) {
        self.infos.lock().unwrap().push_back(Some(fields));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn appended(&self) -> Vec<(String, Option<String>)> {
        self.appended.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn idle_source(&self) -> BoxChunkSource {
        let (feed, source) = feed();
        self.idle.lock().unwrap().push(feed);
        source
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn scan(&self) -> TransportResult<Vec<PortId>> {
        self.record(Call::Scan);
        let next = self.scans.lock().unwrap().pop_front().flatten();
        next.ok_or_else(|| failure("scan"))
    }

    async fn connect(&self, ports: &[PortId]) -> TransportResult<ConnectReply> {
        self.record(Call::Connect(ports.to_vec()));
        let next = self.connects.lock().unwrap().pop_front();
        match next {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(failure("connect")),
            None => Ok(ConnectReply::Streamed(self.idle_source())),
        }
    }

    async fn disconnect(&self, ports: &[PortId]) -> TransportResult<Vec<PortId>> {
        self.record(Call::Disconnect(ports.to_vec()));
        let next = self.disconnects.lock().unwrap().pop_front().flatten();
        next.ok_or_else(|| failure("disconnect"))
    }

    async fn monitor(&self, ports: &[PortId]) -> TransportResult<BoxChunkSource> {
        self.record(Call::Monitor(ports.to_vec()));
        let next = self.monitors.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.idle_source()))
    }

    async fn append_log(&self, message: &str, port: Option<&str>) -> TransportResult<()> {
        self.appended
            .lock()
            .unwrap()
            .push((message.to_string(), port.map(str::to_string)));
        Ok(())
    }

    async fn modem_info(&self, port: &str) -> TransportResult<FieldMap> {
        self.record(Call::ModemInfo(port.to_string()));
        let next = self.infos.lock().unwrap().pop_front().flatten();
        next.ok_or_else(|| failure("modem_info"))
    }
}

pub fn ids(ports: &[&str]) -> Vec<PortId> {
    ports.iter().map(|p| p.to_string()).collect()
}

pub fn open_session(persistence: Persistence) -> SessionHandle {
    SessionHandle::new(Session::open(persistence, EventSink::default()))
}

/// Poll `check` until it holds, letting spawned tasks run in between.
pub async fn eventually(session: &SessionHandle, check: impl Fn(&mut Session) -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !session.with(&check) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Let spawned tasks drain whatever is already queued.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}
