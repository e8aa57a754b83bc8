//! Session event types.
//!
//! Presentation layers subscribe to these instead of polling the session.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::registry::RegistrySnapshot;

/// One user-visible log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogLine {
    /// Local time the line was produced.
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Local>,
    /// Message text.
    pub message: String,
    /// Port the line is about, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl LogLine {
    /// A line stamped with the current time.
    pub fn now(message: impl Into<String>, port: Option<String>) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
            port,
        }
    }
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Whether an action button is the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    /// Selected.
    Active,
    /// Not selected.
    #[default]
    Inactive,
}

/// Connect/disconnect indicator pair. At most one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ActionIndicators {
    /// Connect indicator.
    pub connect: ActionState,
    /// Disconnect indicator.
    pub disconnect: ActionState,
}

impl ActionIndicators {
    /// Connect active, disconnect inactive.
    pub fn connecting() -> Self {
        Self {
            connect: ActionState::Active,
            disconnect: ActionState::Inactive,
        }
    }

    /// Disconnect active, connect inactive.
    pub fn disconnecting() -> Self {
        Self {
            connect: ActionState::Inactive,
            disconnect: ActionState::Active,
        }
    }
}

/// Lifecycle of one connect operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectState {
    /// Nothing started yet.
    #[default]
    Idle,
    /// Request sent, no response yet.
    Requesting,
    /// Reading a streamed response.
    Streaming,
    /// Finished normally.
    Completed,
    /// Stopped by a newer connect, a disconnect or shutdown.
    Cancelled,
    /// The transport failed.
    Failed,
}

impl ConnectState {
    /// Whether the operation is still running.
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, ConnectState::Requesting | ConnectState::Streaming)
    }
}

/// Change notifications emitted by the session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The registry changed; carries the new snapshot.
    RegistryChanged {
        /// Registry after the change.
        snapshot: RegistrySnapshot,
    },
    /// A log line was produced.
    LogLine {
        /// The line.
        line: LogLine,
    },
    /// The interaction lock was set or cleared.
    InteractionDisabledChanged {
        /// New value.
        disabled: bool,
    },
    /// The action indicators changed.
    ActionsChanged {
        /// New indicators.
        actions: ActionIndicators,
    },
    /// The connect operation changed state.
    ConnectStateChanged {
        /// New state.
        state: ConnectState,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_line_display() {
        let line = LogLine {
            timestamp: Local.with_ymd_and_hms(2026, 1, 7, 14, 3, 9).unwrap(),
            message: "connect: COM1".to_string(),
            port: Some("COM1".to_string()),
        };
        assert_eq!(line.to_string(), "[14:03:09] connect: COM1");
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::InteractionDisabledChanged { disabled: true };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"interaction_disabled_changed\""));
        assert!(json.contains("\"disabled\":true"));

        let event = SessionEvent::ConnectStateChanged {
            state: ConnectState::Streaming,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"state\":\"streaming\""));
    }

    #[test]
    fn test_log_line_serialization_skips_missing_port() {
        let event = SessionEvent::LogLine {
            line: LogLine::now("Scanned ports: 2", None),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"log_line\""));
        assert!(json.contains("\"ts\""));
        assert!(!json.contains("\"port\""));
    }

    #[test]
    fn test_indicators() {
        assert_eq!(ActionIndicators::default().connect, ActionState::Inactive);
        assert_eq!(ActionIndicators::connecting().connect, ActionState::Active);
        assert_eq!(ActionIndicators::disconnecting().connect, ActionState::Inactive);
        assert_eq!(ActionIndicators::disconnecting().disconnect, ActionState::Active);
    }

    #[test]
    fn test_in_flight() {
        assert!(ConnectState::Requesting.is_in_flight());
        assert!(ConnectState::Streaming.is_in_flight());
        assert!(!ConnectState::Cancelled.is_in_flight());
        assert!(!ConnectState::Idle.is_in_flight());
    }
}
