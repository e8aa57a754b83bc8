//! Persistence error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing local state.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Failed to read a state file.
    #[error("Failed to read state file {path}: {source}")]
    Read {
        /// Path to the file that couldn't be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a state file.
    #[error("Failed to write state file {path}: {source}")]
    Write {
        /// Path to the file that couldn't be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Stored data could not be encoded or decoded.
    #[error("Invalid state data for '{key}': {source}")]
    Codec {
        /// Storage key.
        key: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A key that cannot be used as a file name.
    #[error("Invalid state key: {0}")]
    InvalidKey(String),

    /// No state directory could be determined.
    #[error("Could not determine a state directory")]
    NoStateDirectory,
}

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;
