//! Port record types.
//!
//! Field values are an open map with a narrow value union: the engine never
//! interprets device-specific fields, it only stores and compares them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::stream::{FrameError, StreamFrame};

/// Opaque port identifier (`COM3`, `/dev/ttyUSB0`, ...).
pub type PortId = String;

/// Field map of one port. Unknown keys are preserved.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Key that always mirrors the record id.
pub const PORT_FIELD: &str = "port";

/// Key that marks a frame as a removal.
pub const REMOVED_FIELD: &str = "removed";

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text value.
    Text(String),
    /// Numeric value, kept in its JSON representation.
    Number(Number),
}

impl FieldValue {
    /// Convert an arbitrary JSON value.
    ///
    /// Strings and numbers map directly. Anything else is stored as its JSON
    /// text so that no information is lost.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => FieldValue::Text(s),
            Value::Number(n) => FieldValue::Number(n),
            other => FieldValue::Text(other.to_string()),
        }
    }

    /// Text used for display and sorting.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

/// Convert a JSON object into a field map.
#[must_use]
pub fn fields_from_json(object: Map<String, Value>) -> FieldMap {
    object
        .into_iter()
        .map(|(k, v)| (k, FieldValue::from_json(v)))
        .collect()
}

/// One port as stored in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortRecord {
    /// Registry key.
    pub id: PortId,
    /// Current field values; `fields["port"]` always equals `id`.
    pub fields: FieldMap,
}

impl PortRecord {
    /// Create a record holding only its `port` field.
    #[must_use]
    pub fn new(id: impl Into<PortId>) -> Self {
        let id = id.into();
        let mut fields = FieldMap::new();
        fields.insert(PORT_FIELD.to_string(), FieldValue::Text(id.clone()));
        Self { id, fields }
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

/// A decoded partial update for one port.
///
/// `removed` is transient: it is acted upon by the session and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PortUpdate {
    /// Target port.
    pub port: PortId,
    /// Fields to merge (without `removed`).
    pub fields: FieldMap,
    /// Whether the frame asks for the port to be removed.
    pub removed: bool,
}

impl PortUpdate {
    /// Build a plain field update.
    #[must_use]
    pub fn fields(port: impl Into<PortId>, fields: FieldMap) -> Self {
        Self {
            port: port.into(),
            fields,
            removed: false,
        }
    }

    /// Build a removal update.
    #[must_use]
    pub fn removal(port: impl Into<PortId>) -> Self {
        Self {
            port: port.into(),
            fields: FieldMap::new(),
            removed: true,
        }
    }
}

impl TryFrom<StreamFrame> for PortUpdate {
    type Error = FrameError;

    fn try_from(frame: StreamFrame) -> Result<Self, Self::Error> {
        let mut payload = frame.payload;

        let port = match payload.get(PORT_FIELD) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(FrameError::MissingPort),
        };

        let removed = matches!(payload.remove(REMOVED_FIELD), Some(Value::Bool(true)));

        Ok(Self {
            port,
            fields: fields_from_json(payload),
            removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(value: Value) -> StreamFrame {
        match value {
            Value::Object(payload) => StreamFrame { payload },
            _ => unreachable!("test frames are objects"),
        }
    }

    #[test]
    fn test_field_value_from_json() {
        assert_eq!(FieldValue::from_json(json!("x")), FieldValue::Text("x".into()));
        assert_eq!(FieldValue::from_json(json!(-65)), FieldValue::from(-65));
        assert_eq!(FieldValue::from_json(json!(true)), FieldValue::Text("true".into()));
        assert_eq!(FieldValue::from_json(json!(null)), FieldValue::Text("null".into()));
        assert_eq!(
            FieldValue::from_json(json!({"a": 1})),
            FieldValue::Text("{\"a\":1}".into())
        );
    }

    #[test]
    fn test_field_value_serde_untagged() {
        let text: FieldValue = serde_json::from_str("\"-70\"").unwrap();
        let num: FieldValue = serde_json::from_str("12.5").unwrap();
        assert_eq!(text, FieldValue::Text("-70".into()));
        assert_eq!(num.to_string(), "12.5");
        assert_eq!(serde_json::to_string(&FieldValue::from(7)).unwrap(), "7");
    }

    #[test]
    fn test_text_and_number_are_distinct() {
        assert_ne!(FieldValue::from("7"), FieldValue::from(7));
    }

    #[test]
    fn test_new_record_has_port_field() {
        let record = PortRecord::new("COM3");
        assert_eq!(record.get(PORT_FIELD), Some(&FieldValue::from("COM3")));
        assert_eq!(record.fields.len(), 1);
    }

    #[test]
    fn test_update_from_frame() {
        let update = PortUpdate::try_from(frame(json!({"port": "COM1", "signal": "-70"}))).unwrap();
        assert_eq!(update.port, "COM1");
        assert!(!update.removed);
        assert_eq!(update.fields.get("signal"), Some(&FieldValue::from("-70")));
    }

    #[test]
    fn test_removal_frame() {
        let update = PortUpdate::try_from(frame(json!({"port": "COM1", "removed": true}))).unwrap();
        assert!(update.removed);
        assert!(!update.fields.contains_key(REMOVED_FIELD));
    }

    #[test]
    fn test_removed_false_is_not_removal() {
        let update = PortUpdate::try_from(frame(json!({"port": "COM1", "removed": false}))).unwrap();
        assert!(!update.removed);
    }

    #[test]
    fn test_frame_without_port_is_rejected() {
        let err = PortUpdate::try_from(frame(json!({"signal": "-70"}))).unwrap_err();
        assert!(matches!(err, FrameError::MissingPort));
        let err = PortUpdate::try_from(frame(json!({"port": ""}))).unwrap_err();
        assert!(matches!(err, FrameError::MissingPort));
    }
}
