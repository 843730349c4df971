//! MCP tool-call envelope (§6.1): a shape parallel to JSON-RPC, carrying a
//! tool name and arguments instead of a method and params.
//!
//! Internally an MCP call is represented as the same [`Request`]/[`Response`]
//! types the JSON-RPC codec uses, so the dispatcher (§4.4) does not need to
//! know which wire protocol a message arrived on; only the envelope
//! shape differs at the edges.

use serde::Deserialize;
use serde_json::Value;

use vxd_core::DaemonError;

use crate::codec::{Request, Response};

#[derive(Debug, Deserialize)]
struct RawToolCall {
    tool: Option<Value>,
    #[serde(default)]
    arguments: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
}

/// Parse an MCP tool-call payload into the shared [`Request`] shape.
///
/// # Errors
///
/// Returns [`DaemonError::ParseError`] if the bytes are not valid JSON, or
/// [`DaemonError::MissingField`] if `tool` is absent or empty.
pub fn parse(bytes: &[u8]) -> Result<Request, DaemonError> {
    let raw: RawToolCall = serde_json::from_slice(bytes).map_err(|e| DaemonError::ParseError(e.to_string()))?;

    let method = match raw.tool {
        Some(Value::String(name)) if !name.is_empty() => name,
        _ => return Err(DaemonError::MissingField("tool".into())),
    };

    let params = raw.arguments.unwrap_or(Value::Null);
    let id = match raw.id {
        None => None,
        Some(v @ (Value::Null | Value::Number(_) | Value::String(_))) => Some(v),
        Some(_) => return Err(DaemonError::InvalidRequest("id must be null, number, or string".into())),
    };

    Ok(Request { method, params, id })
}

/// Serialize a dispatcher [`Response`] back into an MCP-shaped envelope.
/// The underlying JSON-RPC `Response` already carries `result`/`error`/`id`
/// in the right shape; MCP only differs in omitting `jsonrpc`.
///
/// # Errors
///
/// Returns [`DaemonError::Internal`] if serialization fails.
pub fn to_bytes(response: &Response) -> Result<Vec<u8>, DaemonError> {
    let bytes = response.to_bytes()?;
    let mut value: Value = serde_json::from_slice(&bytes).map_err(|e| DaemonError::Internal(e.to_string()))?;
    if let Value::Object(map) = &mut value {
        map.remove("jsonrpc");
    }
    serde_json::to_vec(&value).map_err(|e| DaemonError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_tool_call() {
        let bytes = br#"{"tool":"add_voxel","arguments":{"x":1},"id":1}"#;
        let req = parse(bytes).unwrap();
        assert_eq!(req.method, "add_voxel");
        assert_eq!(req.params, serde_json::json!({"x": 1}));
    }

    #[test]
    fn missing_tool_is_rejected() {
        let bytes = br#"{"arguments":{}}"#;
        assert!(matches!(parse(bytes), Err(DaemonError::MissingField(_))));
    }

    #[test]
    fn to_bytes_omits_jsonrpc_field() {
        let response = Response::success(serde_json::json!(1), &serde_json::json!({"ok": true}));
        let bytes = to_bytes(&response).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("jsonrpc"));
    }
}
