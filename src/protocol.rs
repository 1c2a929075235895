//! JSON-RPC wire codec
//!
//! Message types exchanged with the agent runtime and the strict
//! encode/decode pair between messages and frame bytes. Encoding is
//! deterministic and round-trips: `decode(encode(m)) == m` for every
//! representable [`Message`]. Framing (how a byte stream becomes discrete
//! frames) lives in the transport layer, not here.

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version advertised during the handshake
pub const PROTOCOL_VERSION: &str = "2025-06-18";

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
/// Implementation-defined code for contained tool handler failures
pub const TOOL_ERROR: i32 = -32000;

/// JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }
}

/// JSON-RPC notification (no id, no response expected)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// Tagged variant over the three JSON-RPC message kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl Message {
    /// Encode to the JSON body of one frame
    pub fn encode(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            Message::Request(r) => serde_json::to_vec(r)?,
            Message::Response(r) => serde_json::to_vec(r)?,
            Message::Notification(n) => serde_json::to_vec(n)?,
        };
        Ok(bytes)
    }

    /// Decode one frame body into a classified message.
    ///
    /// Classification is strict: a message with missing or mistyped
    /// required fields is rejected with [`SessionError::MalformedMessage`],
    /// never coerced into a best-effort variant.
    ///
    /// - `method` present, `id` present → Request
    /// - `method` present, no `id` → Notification
    /// - `id` present with exactly one of `result`/`error` → Response
    pub fn decode(bytes: &[u8]) -> Result<Message> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| SessionError::MalformedMessage(format!("invalid JSON: {}", e)))?;
        let obj = value
            .as_object()
            .ok_or_else(|| SessionError::MalformedMessage("not a JSON object".to_string()))?;

        let jsonrpc = obj
            .get("jsonrpc")
            .and_then(|v| v.as_str())
            .unwrap_or("2.0")
            .to_string();

        if let Some(method) = obj.get("method") {
            let method = method
                .as_str()
                .ok_or_else(|| {
                    SessionError::MalformedMessage("'method' must be a string".to_string())
                })?
                .to_string();
            let params = obj.get("params").cloned();

            return match obj.get("id") {
                Some(id) => {
                    let id = decode_id(id)?;
                    Ok(Message::Request(JsonRpcRequest {
                        jsonrpc,
                        id,
                        method,
                        params,
                    }))
                }
                None => Ok(Message::Notification(JsonRpcNotification {
                    jsonrpc,
                    method,
                    params,
                })),
            };
        }

        if let Some(id) = obj.get("id") {
            let id = decode_id(id)?;
            let result = obj.get("result").cloned();
            let error = match obj.get("error") {
                Some(e) => Some(serde_json::from_value::<JsonRpcError>(e.clone()).map_err(
                    |e| SessionError::MalformedMessage(format!("invalid 'error' object: {}", e)),
                )?),
                None => None,
            };

            return match (&result, &error) {
                (None, None) => Err(SessionError::MalformedMessage(
                    "response carries neither 'result' nor 'error'".to_string(),
                )),
                (Some(_), Some(_)) => Err(SessionError::MalformedMessage(
                    "response carries both 'result' and 'error'".to_string(),
                )),
                _ => Ok(Message::Response(JsonRpcResponse {
                    jsonrpc,
                    id,
                    result,
                    error,
                })),
            };
        }

        Err(SessionError::MalformedMessage(
            "message has neither 'method' nor 'id'".to_string(),
        ))
    }
}

fn decode_id(id: &Value) -> Result<u64> {
    id.as_u64().ok_or_else(|| {
        SessionError::MalformedMessage(format!("'id' must be an unsigned integer, got {}", id))
    })
}

impl From<JsonRpcRequest> for Message {
    fn from(r: JsonRpcRequest) -> Self {
        Message::Request(r)
    }
}

impl From<JsonRpcResponse> for Message {
    fn from(r: JsonRpcResponse) -> Self {
        Message::Response(r)
    }
}

impl From<JsonRpcNotification> for Message {
    fn from(n: JsonRpcNotification) -> Self {
        Message::Notification(n)
    }
}
