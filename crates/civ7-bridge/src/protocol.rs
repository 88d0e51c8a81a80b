//! JSON-RPC 2.0 message types.
//!
//! One message per line on stdio. Requests without an `id` are
//! notifications and never get a response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version string every message carries.
pub const JSONRPC_VERSION: &str = "2.0";

/// Invalid JSON was received.
pub const ERROR_PARSE: i64 = -32700;
/// The JSON is not a valid request object.
pub const ERROR_INVALID_REQUEST: i64 = -32600;
/// The method does not exist.
pub const ERROR_METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const ERROR_INVALID_PARAMS: i64 = -32602;

/// Incoming request or notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be `"2.0"`
    pub jsonrpc: String,
    /// Absent for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Whether the sender expects no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Outgoing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponse {
    /// Success
    Result(JsonRpcResult),
    /// Failure
    Error(JsonRpcErrorResponse),
}

/// Successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResult {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Echo of the request ID
    pub id: Value,
    /// Method result
    pub result: Value,
}

/// Error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Echo of the request ID; `null` if it could not be read
    pub id: Option<Value>,
    /// What went wrong
    pub error: JsonRpcError,
}

/// Error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// One of the `ERROR_*` codes
    pub code: i64,
    /// Human-readable message
    pub message: String,
}

impl JsonRpcResponse {
    /// Success response.
    pub fn result(id: Option<Value>, result: Value) -> Self {
        Self::Result(JsonRpcResult {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.unwrap_or(Value::Null),
            result,
        })
    }

    /// Error response.
    pub fn error(id: Option<Value>, code: i64, message: impl Into<String>) -> Self {
        Self::Error(JsonRpcErrorResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: JsonRpcError { code, message: message.into() },
        })
    }

    /// `method not found` error.
    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(id, ERROR_METHOD_NOT_FOUND, format!("method '{method}' not found"))
    }

    /// `invalid params` error.
    pub fn invalid_params(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, ERROR_INVALID_PARAMS, message)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn notification_has_no_id() {
        let request: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
                .unwrap();
        assert!(request.is_notification());
        assert!(request.params.is_none());
    }

    #[test]
    fn result_serializes_flat() {
        let response = JsonRpcResponse::result(Some(json!(7)), json!({"ok": true}));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"jsonrpc": "2.0", "id": 7, "result": {"ok": true}})
        );
    }

    #[test]
    fn error_without_id_serializes_null() {
        let response = JsonRpcResponse::error(None, ERROR_PARSE, "invalid json");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32700, "message": "invalid json"}})
        );
    }
}
