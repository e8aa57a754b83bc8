//! Error types for backend transport operations.

use thiserror::Error;

/// Errors from talking to the modem backend.
///
/// Every transport error is non-fatal for the engine: callers log it and
/// leave the registry as it was.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured base URL or an endpoint path is invalid.
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    /// The URL scheme is not served by this client.
    #[error("Unsupported URL scheme '{0}' (only http is supported)")]
    UnsupportedScheme(String),

    /// The request could not be built or sent.
    #[error("Request to {url} failed: {message}")]
    Request {
        /// Target URL.
        url: String,
        /// Underlying error text.
        message: String,
    },

    /// No response within the configured timeout.
    #[error("Request to {url} timed out after {after_ms} ms")]
    Timeout {
        /// Target URL.
        url: String,
        /// Configured timeout.
        after_ms: u64,
    },

    /// The backend answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Target URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Reading the response body failed mid-way.
    #[error("Response body error: {0}")]
    Body(String),

    /// The response body was not the JSON we expected.
    #[error("Invalid response JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
