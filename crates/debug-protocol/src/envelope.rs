//! JSON-RPC 2.0 envelope as carried over the WebSocket to the target.
//!
//! Outbound frames are always requests: `{"id", "method", "params"}`.
//! Inbound frames are either a response (keyed by `id`) or a method
//! notification (no `id`). We decode by inspecting the raw JSON object
//! rather than deriving an untagged enum, since "has an `id` field" is a
//! cheaper and more precise discriminant than trying every variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An outbound JSON-RPC request: `{"id":<int>,"method":"<Domain.Command>","params":{…}}`.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// The target's reply to one outbound request.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// A decoded inbound frame: either a response correlated to a request id,
/// or a notification routed by method name.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    Response {
        id: u64,
        outcome: Result<Value, RpcError>,
    },
    Notification {
        method: String,
        params: Value,
    },
}

/// Error decoding a raw text frame into an [`InboundFrame`].
///
/// Malformed frames are logged and dropped by the caller; this type exists
/// only to let the caller log a useful message before dropping.
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed inbound frame: {0}")]
pub struct FrameDecodeError(pub String);

/// Decode one inbound text frame.
///
/// A frame with an `id` key is a response; `result` and `error` are mutually
/// exclusive per JSON-RPC 2.0, and we treat an `error` object's absence as a
/// result (even `null`). A frame without `id` is a method notification and
/// must carry `method`.
pub fn decode_inbound(text: &str) -> Result<InboundFrame, FrameDecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| FrameDecodeError(format!("invalid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| FrameDecodeError("top-level frame must be a JSON object".into()))?;

    if let Some(id_value) = object.get("id") {
        let id = id_value
            .as_u64()
            .ok_or_else(|| FrameDecodeError("`id` must be a non-negative integer".into()))?;
        if let Some(error_value) = object.get("error") {
            let error: RpcError = serde_json::from_value(error_value.clone())
                .map_err(|e| FrameDecodeError(format!("invalid `error` object: {e}")))?;
            return Ok(InboundFrame::Response {
                id,
                outcome: Err(error),
            });
        }
        let result = object.get("result").cloned().unwrap_or(Value::Null);
        return Ok(InboundFrame::Response {
            id,
            outcome: Ok(result),
        });
    }

    let method = object
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| FrameDecodeError("notification is missing `method`".into()))?
        .to_owned();
    let params = object.get("params").cloned().unwrap_or(Value::Null);
    Ok(InboundFrame::Notification { method, params })
}

/// Serialize an outbound request to the wire text form.
pub fn encode_outbound(req: &OutboundRequest) -> Result<String, serde_json::Error> {
    serde_json::to_string(req)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_result_response() {
        let frame = decode_inbound(r#"{"id":3,"result":{"ok":true}}"#).unwrap();
        match frame {
            InboundFrame::Response { id, outcome } => {
                assert_eq!(id, 3);
                assert_eq!(outcome.unwrap(), serde_json::json!({"ok": true}));
            }
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn decodes_an_error_response() {
        let frame = decode_inbound(r#"{"id":4,"error":{"code":-1,"message":"nope"}}"#).unwrap();
        match frame {
            InboundFrame::Response { id, outcome } => {
                assert_eq!(id, 4);
                let err = outcome.unwrap_err();
                assert_eq!(err.code, -1);
                assert_eq!(err.message, "nope");
            }
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn decodes_a_notification() {
        let frame = decode_inbound(r#"{"method":"Debugger.resumed","params":{}}"#).unwrap();
        match frame {
            InboundFrame::Notification { method, .. } => assert_eq!(method, "Debugger.resumed"),
            _ => panic!("expected notification"),
        }
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(decode_inbound("not json").is_err());
        assert!(decode_inbound(r#"{"params":{}}"#).is_err()); // notification without method
    }

    #[test]
    fn response_without_result_or_error_is_a_null_result() {
        let frame = decode_inbound(r#"{"id":1}"#).unwrap();
        match frame {
            InboundFrame::Response { id, outcome } => {
                assert_eq!(id, 1);
                assert_eq!(outcome.unwrap(), Value::Null);
            }
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn encodes_outbound_requests() {
        let req = OutboundRequest {
            id: 7,
            method: "Debugger.enable".to_owned(),
            params: serde_json::json!({}),
        };
        let json = encode_outbound(&req).unwrap();
        assert_eq!(json, r#"{"id":7,"method":"Debugger.enable","params":{}}"#);
    }
}
