//! Session error types.

use thiserror::Error;

/// Errors returned by session commands.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A command was refused because a disconnect locked interaction.
    #[error("Cannot {0} while interaction is disabled")]
    InteractionDisabled(&'static str),

    /// A column command named no column.
    #[error("Column key must not be empty")]
    EmptyColumnKey,
}

/// Result type for session commands.
pub type SessionResult<T> = Result<T, SessionError>;
