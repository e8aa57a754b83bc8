//! Configuration system for modemsync.
//!
//! This module provides TOML configuration loading with hierarchy merging.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded from multiple sources and merged in order:
//!
//! 1. Embedded defaults
//! 2. User config: `~/.config/modemsync/config.toml`
//! 3. Additional config file (via `--config` flag)
//! 4. CLI flags (highest priority)
//!
//! # Example
//!
//! ```toml
//! [server]
//! base_url = "http://192.168.1.20:5000"
//! request_timeout_ms = 5000
//!
//! [endpoints]
//! monitor = "/api/monitor"
//!
//! [storage]
//! state_dir = "/var/lib/modemsync"
//!
//! [log]
//! remote_append = false
//! ```

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{Config, DEFAULT_CONFIG, EndpointsConfig, LogConfig, ServerConfig, StorageConfig};
