//! Request and response bodies exchanged with the backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::ConnectReply;
use crate::registry::{FieldMap, PortId, fields_from_json};

/// Body of connect and disconnect requests.
#[derive(Debug, Clone, Serialize)]
pub struct PortsRequest<'a> {
    /// Ports acted upon.
    pub ports: &'a [PortId],
}

/// Body of a log append request.
#[derive(Debug, Clone, Serialize)]
pub struct LogAppendRequest<'a> {
    /// Log text.
    pub message: &'a str,
    /// Port the line refers to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<&'a str>,
}

/// Body of a single-port info request.
#[derive(Debug, Clone, Serialize)]
pub struct ModemInfoRequest<'a> {
    /// Port to query.
    pub port: &'a str,
}

/// Response carrying a port list (scan, disconnect).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortsResponse {
    /// Reported ports; missing means empty.
    #[serde(default)]
    pub ports: Vec<PortId>,
}

/// Interpret a non-streamed connect response.
///
/// `results` wins over `ports`. When both are present the batch follows
/// the order of `ports`, then any remaining result keys.
#[must_use]
pub fn interpret_connect_body(body: Value) -> ConnectReply {
    let Value::Object(mut object) = body else {
        return ConnectReply::Other(body);
    };

    let ports: Option<Vec<PortId>> = object
        .get("ports")
        .and_then(|p| serde_json::from_value(p.clone()).ok());

    match object.remove("results") {
        Some(Value::Object(mut results)) => {
            let mut batch: Vec<(PortId, FieldMap)> = Vec::with_capacity(results.len());
            for port in ports.unwrap_or_default() {
                if let Some(value) = results.remove(&port) {
                    push_result(&mut batch, port, value);
                }
            }
            for (port, value) in results {
                push_result(&mut batch, port, value);
            }
            ConnectReply::Results(batch)
        }
        Some(other) => {
            object.insert("results".to_string(), other);
            ConnectReply::Other(Value::Object(object))
        }
        None => match ports {
            Some(ports) => ConnectReply::Ports(ports),
            None => ConnectReply::Other(Value::Object(object)),
        },
    }
}

fn push_result(batch: &mut Vec<(PortId, FieldMap)>, port: PortId, value: Value) {
    match value {
        Value::Object(fields) => batch.push((port, fields_from_json(fields))),
        other => warn!("Ignoring non-object connect result for {}: {}", port, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldValue;
    use serde_json::json;

    #[test]
    fn test_results_follow_ports_order() {
        let reply = interpret_connect_body(json!({
            "success": true,
            "ports": ["COM3", "COM1"],
            "results": {
                "COM1": {"signal": "-70"},
                "COM3": {"error": "timeout"},
                "COM9": {"signal": "-90"}
            }
        }));
        let ConnectReply::Results(batch) = reply else {
            unreachable!("expected results");
        };
        let ids: Vec<&str> = batch.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(ids, vec!["COM3", "COM1", "COM9"]);
        assert_eq!(batch[0].1.get("error"), Some(&FieldValue::from("timeout")));
    }

    #[test]
    fn test_ports_only() {
        let reply = interpret_connect_body(json!({"ports": ["COM1"]}));
        assert!(matches!(reply, ConnectReply::Ports(p) if p == vec!["COM1".to_string()]));
    }

    #[test]
    fn test_other_shapes() {
        assert!(matches!(
            interpret_connect_body(json!({"success": false})),
            ConnectReply::Other(_)
        ));
        assert!(matches!(interpret_connect_body(json!([1])), ConnectReply::Other(_)));
        assert!(matches!(
            interpret_connect_body(json!({"results": 5})),
            ConnectReply::Other(_)
        ));
    }

    #[test]
    fn test_non_object_result_skipped() {
        let reply = interpret_connect_body(json!({"results": {"COM1": "bad", "COM2": {}}}));
        let ConnectReply::Results(batch) = reply else {
            unreachable!("expected results");
        };
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].0, "COM2");
    }

    #[test]
    fn test_request_bodies() {
        let ports = vec!["COM1".to_string()];
        assert_eq!(
            serde_json::to_string(&PortsRequest { ports: &ports }).unwrap(),
            r#"{"ports":["COM1"]}"#
        );
        assert_eq!(
            serde_json::to_string(&LogAppendRequest { message: "hi", port: None }).unwrap(),
            r#"{"message":"hi"}"#
        );
    }

    #[test]
    fn test_ports_response_default() {
        let resp: PortsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.ports.is_empty());
    }
}
