//! Wire codec: JSON-RPC 2.0 request/response parsing and serialization.
//!
//! Parsing validates the envelope per the JSON-RPC 2.0 spec (version,
//! method, optional params/id) and applies the deep-copy policy at the
//! parse→request and result→response boundaries: `serde_json::Value` is
//! already an owned tree, so "deep clone" here means the request/response
//! types never borrow from the original parsed document — every field is
//! moved or cloned out of it before the parser's `Value` is dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vxd_core::DaemonError;

/// A parsed JSON-RPC request, owning its `params` independently of whatever
/// tree it was parsed out of.
#[derive(Debug, Clone)]
pub struct Request {
    /// The method name, 1..128 chars.
    pub method: String,
    /// Parameters, defaulting to `Value::Null` when absent.
    pub params: Value,
    /// Correlation id. `None` marks this request as a notification.
    pub id: Option<Value>,
}

impl Request {
    /// Whether this request is a notification (no response expected).
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A response ready for serialization back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcErrorBody>,
    id: Value,
}

#[derive(Debug, Clone, Serialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl Response {
    /// Build a success response, deep-cloning `result` into its own
    /// serialization tree (a `Value` clone is already a deep copy).
    #[must_use]
    pub fn success(id: Value, result: &Value) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result.clone()),
            error: None,
            id,
        }
    }

    /// Build an error response from a [`DaemonError`].
    #[must_use]
    pub fn error(id: Value, err: &DaemonError) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(RpcErrorBody {
                code: err.rpc_code(),
                message: err.to_string(),
                data: None,
            }),
            id,
        }
    }

    /// Serialize to a JSON byte vector.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Internal`] if serialization fails (should
    /// only happen if a handler's result contains non-finite floats).
    pub fn to_bytes(&self) -> Result<Vec<u8>, DaemonError> {
        serde_json::to_vec(self).map_err(|e| DaemonError::Internal(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    jsonrpc: Option<Value>,
    method: Option<Value>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
}

/// Parse one JSON document as either a single request or a batch.
///
/// # Errors
///
/// Returns [`DaemonError::ParseError`] if the bytes are not valid JSON.
pub fn parse(bytes: &[u8]) -> Result<ParsedPayload, DaemonError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DaemonError::ParseError(e.to_string()))?;
    match value {
        Value::Array(items) => Ok(ParsedPayload::Batch(
            items.into_iter().map(parse_one).collect(),
        )),
        other => Ok(ParsedPayload::Single(parse_one(other))),
    }
}

/// The result of parsing a top-level JSON document.
#[derive(Debug)]
pub enum ParsedPayload {
    /// A single request.
    Single(Result<Request, DaemonError>),
    /// A batch of independently-parsed requests/errors, in array order.
    Batch(Vec<Result<Request, DaemonError>>),
}

fn parse_one(value: Value) -> Result<Request, DaemonError> {
    let Value::Object(_) = &value else {
        return Err(DaemonError::InvalidRequest("top-level value is not an object".into()));
    };
    let raw: RawRequest =
        serde_json::from_value(value).map_err(|e| DaemonError::InvalidRequest(e.to_string()))?;

    match raw.jsonrpc {
        Some(Value::String(v)) if v == "2.0" => {}
        _ => return Err(DaemonError::InvalidVersion),
    }

    let method = match raw.method {
        Some(Value::String(m)) if !m.is_empty() && m.len() < 128 => m,
        Some(Value::String(_)) => {
            return Err(DaemonError::InvalidRequest("method name out of bounds".into()));
        }
        _ => return Err(DaemonError::MissingField("method".into())),
    };

    let params = match raw.params {
        None | Some(Value::Null) => Value::Null,
        Some(p @ (Value::Array(_) | Value::Object(_))) => p,
        Some(_) => return Err(DaemonError::InvalidRequest("params must be array or object".into())),
    };

    let id = match raw.id {
        None => None,
        Some(v @ (Value::Null | Value::Number(_) | Value::String(_))) => Some(v),
        Some(_) => return Err(DaemonError::InvalidRequest("id must be null, number, or string".into())),
    };

    Ok(Request { method, params, id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_request() {
        let bytes = br#"{"jsonrpc":"2.0","method":"ping","id":1}"#;
        let ParsedPayload::Single(Ok(req)) = parse(bytes).unwrap() else {
            panic!("expected a single parsed request");
        };
        assert_eq!(req.method, "ping");
        assert_eq!(req.id, Some(Value::from(1)));
        assert!(!req.is_notification());
    }

    #[test]
    fn missing_id_is_a_notification() {
        let bytes = br#"{"jsonrpc":"2.0","method":"ping"}"#;
        let ParsedPayload::Single(Ok(req)) = parse(bytes).unwrap() else {
            panic!("expected a single parsed request");
        };
        assert!(req.is_notification());
    }

    #[test]
    fn wrong_version_is_rejected() {
        let bytes = br#"{"jsonrpc":"1.0","method":"ping"}"#;
        let ParsedPayload::Single(Err(err)) = parse(bytes).unwrap() else {
            panic!("expected a parse failure");
        };
        assert!(matches!(err, DaemonError::InvalidVersion));
    }

    #[test]
    fn missing_method_is_rejected() {
        let bytes = br#"{"jsonrpc":"2.0"}"#;
        let ParsedPayload::Single(Err(err)) = parse(bytes).unwrap() else {
            panic!("expected a parse failure");
        };
        assert!(matches!(err, DaemonError::MissingField(_)));
    }

    #[test]
    fn batch_parses_each_element_independently() {
        let bytes = br#"[{"jsonrpc":"2.0","method":"ping","id":1},{"jsonrpc":"1.0","method":"x"}]"#;
        let ParsedPayload::Batch(results) = parse(bytes).unwrap() else {
            panic!("expected a batch");
        };
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn non_object_top_level_is_rejected() {
        let bytes = br#""just a string""#;
        let ParsedPayload::Single(Err(err)) = parse(bytes).unwrap() else {
            panic!("expected a parse failure");
        };
        assert!(matches!(err, DaemonError::InvalidRequest(_)));
    }

    #[test]
    fn response_success_round_trips_through_serde() {
        let resp = Response::success(Value::from(1), &serde_json::json!({"ok": true}));
        let bytes = resp.to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["result"]["ok"], true);
        assert_eq!(value["jsonrpc"], "2.0");
    }

    #[test]
    fn response_error_carries_the_rpc_code() {
        let resp = Response::error(Value::Null, &DaemonError::MethodNotFound("x".into()));
        let bytes = resp.to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"]["code"], -32601);
    }
}
