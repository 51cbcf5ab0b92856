//! JSON-RPC 2.0 over newline-delimited stdio.
//!
//! One request per line on the input, one response per line on the
//! output. Requests are handled in arrival order; notifications (no `id`)
//! are never answered.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use super::{handle_method, SharedState};
use crate::error::ServerError;

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod rpc_tests;

/// Invalid JSON was received.
pub const PARSE_ERROR: i32 = -32700;
/// The JSON is not a valid request object.
pub const INVALID_REQUEST: i32 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i32 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications). An explicit `null`
    /// is an identifier, not a notification.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

fn present<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier (null when the request could not be read).
    pub id: Value,
    /// The result on success (mutually exclusive with error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure (mutually exclusive with result).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code (negative for predefined errors).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC error code for a handler error
pub fn error_code(error: &ServerError) -> i32 {
    match error {
        ServerError::InvalidRequest { .. } => INVALID_REQUEST,
        ServerError::UnknownMethod { .. } => METHOD_NOT_FOUND,
        ServerError::InvalidParameters { .. } => INVALID_PARAMS,
        ServerError::Json(_) => INTERNAL_ERROR,
    }
}

/// Moderation server running over stdio.
pub struct RpcServer {
    state: SharedState,
}

impl RpcServer {
    /// Create a new server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Serve stdin/stdout until EOF
    pub async fn run(&self) -> std::io::Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve any line-oriented reader/writer pair until EOF
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Moderation server ready, waiting for requests");
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            // EOF reached
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            if let Some(response) = self.handle_line(trimmed).await {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle one raw line. Returns None when no response is due.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "Failed to parse request");
                return Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                let err = ServerError::InvalidRequest {
                    message: e.to_string(),
                };
                warn!(error = %err, "Rejecting request");
                Some(JsonRpcResponse::error(id, error_code(&err), err.to_string()))
            }
        }
    }

    /// Handle a single JSON-RPC request
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            debug!(method = %request.method, "Notification received, ignoring");
            return None;
        };

        if request.jsonrpc != "2.0" {
            let err = ServerError::InvalidRequest {
                message: format!("unsupported jsonrpc version {:?}", request.jsonrpc),
            };
            warn!(error = %err, "Rejecting request");
            return Some(JsonRpcResponse::error(
                Some(id),
                error_code(&err),
                err.to_string(),
            ));
        }

        if request.method == "ping" {
            return Some(JsonRpcResponse::success(
                Some(id),
                Value::Object(Default::default()),
            ));
        }

        let response = match handle_method(&self.state, &request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(Some(id), result),
            Err(e) => {
                warn!(method = %request.method, error = %e, "Request failed");
                JsonRpcResponse::error(Some(id), error_code(&e), e.to_string())
            }
        };
        Some(response)
    }
}
