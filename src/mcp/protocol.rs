//! JSON-RPC 2.0 messages as the server sees them.
//!
//! Hosts send [`JsonRpcRequest`]s; the server only ever reads them. It
//! answers with [`JsonRpcResponse`]s, which it only ever writes. A request
//! without an `id` is a notification and gets no answer.
//!
//! # Example
//!
//! ```
//! use openvision::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
//! use serde_json::json;
//!
//! let request: JsonRpcRequest =
//!     serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
//! let id = request.id().unwrap().to_value();
//! let response = JsonRpcResponse::success(id, json!({}));
//! assert!(response.error().is_none());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request id chosen by the host: a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id
    Number(i64),
    /// String id
    String(String),
}

impl RequestId {
    /// Returns the id as JSON, for echoing in the response.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::from(*n),
            Self::String(s) => Value::from(s.as_str()),
        }
    }
}

/// An incoming request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    id: Option<RequestId>,
    method: String,
    #[serde(default)]
    params: Value,
}

impl JsonRpcRequest {
    /// Returns the method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the parameters, `null` when absent.
    #[must_use]
    pub fn params(&self) -> &Value {
        &self.params
    }

    /// Returns the id, or `None` for notifications.
    #[must_use]
    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Input was not valid JSON (-32700).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error")
    }

    /// Input was JSON but not a request object (-32600).
    #[must_use]
    pub fn invalid_request() -> Self {
        Self::new(-32600, "Invalid Request")
    }

    /// No handler for `method` (-32601).
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("Method not found: {method}"))
    }

    /// Parameters did not fit the method (-32602).
    #[must_use]
    pub fn invalid_params(details: &str) -> Self {
        Self::new(-32602, format!("Invalid params: {details}"))
    }
}

/// An outgoing response. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: &'static str,
    // Serialized as `null` when the request id could not be read.
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Creates a successful response.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn new_error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Returns the echoed id.
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// Returns the result, if this is a success.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the error, if this is a failure.
    #[must_use]
    pub fn error(&self) -> Option<&JsonRpcError> {
        self.error.as_ref()
    }
}
