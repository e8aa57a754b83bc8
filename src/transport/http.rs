//! HTTP backend on the hyper client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Method, Request, Response, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use super::error::{TransportError, TransportResult};
use super::wire::{
    LogAppendRequest, ModemInfoRequest, PortsRequest, PortsResponse, interpret_connect_body,
};
use super::{Backend, BoxChunkSource, ChunkSource, ConnectReply};
use crate::config::{Config, EndpointsConfig};
use crate::registry::{FieldMap, PortId, fields_from_json};

/// Media type of a streamed response.
pub const EVENT_STREAM: &str = "text/event-stream";

const JSON: &str = "application/json";

/// Backend reached over plain HTTP/1.1.
pub struct HttpBackend {
    client: Client<HttpConnector, Full<Bytes>>,
    base: Url,
    endpoints: EndpointsConfig,
    timeout: Duration,
}

impl HttpBackend {
    /// Create a backend for `base_url`.
    pub fn new(base_url: &str, endpoints: EndpointsConfig, timeout: Duration) -> TransportResult<Self> {
        let base = Url::parse(base_url).map_err(|e| TransportError::InvalidUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        if base.scheme() != "http" {
            return Err(TransportError::UnsupportedScheme(base.scheme().to_string()));
        }

        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            base,
            endpoints,
            timeout,
        })
    }

    /// Create a backend from the `[server]` and `[endpoints]` sections.
    pub fn from_config(config: &Config) -> TransportResult<Self> {
        Self::new(
            &config.server.base_url,
            config.endpoints.clone(),
            Duration::from_millis(config.server.request_timeout_ms),
        )
    }

    /// Resolve an endpoint path against the base URL.
    fn url(&self, path: &str) -> TransportResult<Url> {
        self.base.join(path).map_err(|e| TransportError::InvalidUrl {
            url: path.to_string(),
            message: e.to_string(),
        })
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Send a request and wait for the response head.
    ///
    /// Only the head is bounded by the timeout; a streamed body may stay
    /// open for as long as the backend keeps it open.
    async fn send(
        &self,
        method: Method,
        url: &Url,
        accept: &str,
        body: Option<Vec<u8>>,
    ) -> TransportResult<Response<Incoming>> {
        let uri = url
            .as_str()
            .parse::<Uri>()
            .map_err(|e| TransportError::InvalidUrl {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let mut builder = Request::builder().method(method).uri(uri).header(ACCEPT, accept);
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, JSON);
        }
        let request = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        trace!("{} {}", request.method(), url);

        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| TransportError::Timeout {
                url: url.to_string(),
                after_ms: self.timeout_ms(),
            })?
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Read a whole response body, bounded by the timeout.
    async fn read_json(&self, url: &Url, response: Response<Incoming>) -> TransportResult<Value> {
        let collected = tokio::time::timeout(self.timeout, response.into_body().collect())
            .await
            .map_err(|_| TransportError::Timeout {
                url: url.to_string(),
                after_ms: self.timeout_ms(),
            })?
            .map_err(|e| TransportError::Body(e.to_string()))?;

        let bytes = collected.to_bytes();
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> TransportResult<Value> {
        let url = self.url(path)?;
        let response = self
            .send(Method::POST, &url, JSON, Some(serde_json::to_vec(body)?))
            .await?;
        self.read_json(&url, response).await
    }

    async fn post_decode<B, T>(&self, path: &str, body: &B) -> TransportResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Default,
    {
        match self.post_json(path, body).await? {
            Value::Null => Ok(T::default()),
            value => Ok(serde_json::from_value(value)?),
        }
    }
}

/// Whether a response announces an event stream.
fn is_event_stream<B>(response: &Response<B>) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with(EVENT_STREAM))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn scan(&self) -> TransportResult<Vec<PortId>> {
        let url = self.url(&self.endpoints.scan)?;
        let response = self.send(Method::GET, &url, JSON, None).await?;
        let body = self.read_json(&url, response).await?;
        if body.is_null() {
            return Ok(Vec::new());
        }
        let reply: PortsResponse = serde_json::from_value(body)?;
        Ok(reply.ports)
    }

    async fn connect(&self, ports: &[PortId]) -> TransportResult<ConnectReply> {
        let url = self.url(&self.endpoints.connect)?;
        let body = serde_json::to_vec(&PortsRequest { ports })?;
        let response = self.send(Method::POST, &url, EVENT_STREAM, Some(body)).await?;

        if is_event_stream(&response) {
            debug!("Connect answered with an event stream");
            return Ok(ConnectReply::Streamed(Box::new(BodyChunks::new(response.into_body()))));
        }

        let body = self.read_json(&url, response).await?;
        Ok(interpret_connect_body(body))
    }

    async fn disconnect(&self, ports: &[PortId]) -> TransportResult<Vec<PortId>> {
        let reply: PortsResponse = self
            .post_decode(&self.endpoints.disconnect, &PortsRequest { ports })
            .await?;
        Ok(reply.ports)
    }

    async fn monitor(&self, ports: &[PortId]) -> TransportResult<BoxChunkSource> {
        let mut url = self.url(&self.endpoints.monitor)?;
        {
            let mut query = url.query_pairs_mut();
            for port in ports {
                query.append_pair("ports", port);
            }
        }
        let response = self.send(Method::GET, &url, EVENT_STREAM, None).await?;
        Ok(Box::new(BodyChunks::new(response.into_body())))
    }

    async fn append_log(&self, message: &str, port: Option<&str>) -> TransportResult<()> {
        self.post_json(&self.endpoints.log, &LogAppendRequest { message, port })
            .await?;
        Ok(())
    }

    async fn modem_info(&self, port: &str) -> TransportResult<FieldMap> {
        match self
            .post_json(&self.endpoints.modem_info, &ModemInfoRequest { port })
            .await?
        {
            Value::Object(fields) => Ok(fields_from_json(fields)),
            Value::Null => Ok(FieldMap::new()),
            other => Err(TransportError::Body(format!(
                "modem info for {} is not an object: {}",
                port, other
            ))),
        }
    }
}

/// Data chunks of a streamed response body.
struct BodyChunks {
    body: Incoming,
}

impl BodyChunks {
    fn new(body: Incoming) -> Self {
        Self { body }
    }
}

#[async_trait]
impl ChunkSource for BodyChunks {
    async fn next_chunk(&mut self) -> Option<TransportResult<Bytes>> {
        loop {
            match self.body.frame().await? {
                Ok(frame) => {
                    // Trailers carry no event data.
                    if let Ok(data) = frame.into_data() {
                        return Some(Ok(data));
                    }
                }
                Err(e) => return Some(Err(TransportError::Body(e.to_string()))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> TransportResult<HttpBackend> {
        HttpBackend::new(base, EndpointsConfig::default(), Duration::from_secs(1))
    }

    #[test]
    fn test_rejects_https() {
        assert!(matches!(
            backend("https://modems.local"),
            Err(TransportError::UnsupportedScheme(s)) if s == "https"
        ));
    }

    #[test]
    fn test_rejects_garbage_url() {
        assert!(matches!(backend("not a url"), Err(TransportError::InvalidUrl { .. })));
    }

    #[test]
    fn test_endpoint_join() {
        let backend = backend("http://127.0.0.1:5000").unwrap();
        let url = backend.url("/api/scan_ports").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/api/scan_ports");
    }

    #[test]
    fn test_is_event_stream() {
        let response = Response::builder()
            .header(CONTENT_TYPE, "text/event-stream; charset=utf-8")
            .body(())
            .unwrap();
        assert!(is_event_stream(&response));

        let response = Response::builder().header(CONTENT_TYPE, JSON).body(()).unwrap();
        assert!(!is_event_stream(&response));

        let response = Response::builder().body(()).unwrap();
        assert!(!is_event_stream(&response));
    }
}
