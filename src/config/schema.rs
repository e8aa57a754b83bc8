//! Configuration schema definitions.
//!
//! Every field deserializes to an "unset" value (empty string, zero, `None`)
//! when absent, so that a partial file only overrides what it names. The
//! real defaults live in the embedded `default.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::ConfigError;
use crate::telemetry::DEFAULT_MAX_LINES;

/// Embedded default configuration.
pub const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Backend server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Backend endpoint paths.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Local state storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// User-visible log settings.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// The embedded defaults.
    pub fn embedded() -> Result<Self, ConfigError> {
        toml::from_str(DEFAULT_CONFIG).map_err(ConfigError::Defaults)
    }

    /// Merge another config into this one.
    ///
    /// Scalars are overridden when set in `other`.
    pub fn merge(&mut self, other: Config) {
        self.server.merge(other.server);
        self.endpoints.merge(other.endpoints);
        self.storage.merge(other.storage);
        self.log.merge(other.log);
    }

    /// Check values that would only fail later, at first use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.request_timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        for (name, path) in self.endpoints.iter() {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: format!("endpoints.{}", name),
                    message: format!("'{}' must be an absolute path", path),
                });
            }
        }
        Ok(())
    }
}

/// Backend server settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ServerConfig {
    /// Base URL of the modem backend.
    #[serde(default)]
    pub base_url: String,

    /// Timeout for request/response calls in milliseconds.
    ///
    /// Streams are only bounded until their response head arrives.
    #[serde(default)]
    pub request_timeout_ms: u64,
}

impl ServerConfig {
    fn merge(&mut self, other: ServerConfig) {
        if !other.base_url.is_empty() {
            self.base_url = other.base_url;
        }
        if other.request_timeout_ms != 0 {
            self.request_timeout_ms = other.request_timeout_ms;
        }
    }
}

/// Backend endpoint paths, relative to the base URL.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EndpointsConfig {
    /// Port scan.
    #[serde(default)]
    pub scan: String,
    /// Streamed connect.
    #[serde(default)]
    pub connect: String,
    /// Disconnect.
    #[serde(default)]
    pub disconnect: String,
    /// Monitor feed.
    #[serde(default)]
    pub monitor: String,
    /// Log append.
    #[serde(default)]
    pub log: String,
    /// Single-port info.
    #[serde(default)]
    pub modem_info: String,
}

impl EndpointsConfig {
    fn merge(&mut self, other: EndpointsConfig) {
        let slots = [
            (&mut self.scan, other.scan),
            (&mut self.connect, other.connect),
            (&mut self.disconnect, other.disconnect),
            (&mut self.monitor, other.monitor),
            (&mut self.log, other.log),
            (&mut self.modem_info, other.modem_info),
        ];
        for (slot, value) in slots {
            if !value.is_empty() {
                *slot = value;
            }
        }
    }

    /// `(name, path)` for every endpoint.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("scan", self.scan.as_str()),
            ("connect", self.connect.as_str()),
            ("disconnect", self.disconnect.as_str()),
            ("monitor", self.monitor.as_str()),
            ("log", self.log.as_str()),
            ("modem_info", self.modem_info.as_str()),
        ]
        .into_iter()
    }
}

/// Local state storage.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    /// Directory for saved state. Defaults to the platform data directory.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Keep state in memory only.
    #[serde(default)]
    pub ephemeral: Option<bool>,
}

impl StorageConfig {
    fn merge(&mut self, other: StorageConfig) {
        if other.state_dir.is_some() {
            self.state_dir = other.state_dir;
        }
        if other.ephemeral.is_some() {
            self.ephemeral = other.ephemeral;
        }
    }

    /// Whether state stays in memory.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral.unwrap_or(false)
    }
}

/// User-visible log settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LogConfig {
    /// Also append every log line to the backend's log.
    #[serde(default)]
    pub remote_append: Option<bool>,

    /// Log lines kept in memory. Zero keeps none.
    #[serde(default)]
    pub max_lines: Option<usize>,
}

impl LogConfig {
    fn merge(&mut self, other: LogConfig) {
        if other.remote_append.is_some() {
            self.remote_append = other.remote_append;
        }
        if other.max_lines.is_some() {
            self.max_lines = other.max_lines;
        }
    }

    /// Whether log lines go to the backend.
    pub fn remote_append(&self) -> bool {
        self.remote_append.unwrap_or(false)
    }

    /// In-memory log history size.
    pub fn max_lines(&self) -> usize {
        self.max_lines.unwrap_or(DEFAULT_MAX_LINES)
    }
}
