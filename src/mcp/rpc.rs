//! JSON-RPC 2.0 method dispatch.
//!
//! Handles one decoded request at a time and returns the response, or
//! `None` for notifications. Framing (stdio lines, HTTP bodies) is the
//! host's concern.
//!
//! | Error | Code |
//! |-------|------|
//! | malformed request | -32600 |
//! | unknown method | -32601 |
//! | caller error (bad dimension, parameter, type, ...) | -32602 |
//! | resource or node not found | -32002 |
//! | anything else | -32603 |
//!
//! Tool failures other than an unknown tool are reported as a successful
//! response carrying `isError: true`, so the agent sees them as tool output.

use serde_json::{json, Value};
use tracing::warn;

use crate::storage::ContentBackend;
use crate::Error;
use super::tools::ToolResult;
use super::ContentRepositoryMcp;

pub const PROTOCOL_VERSION: &str = "2025-06-18";

pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const RESOURCE_NOT_FOUND: i64 = -32002;

/// JSON-RPC error code for a failed operation.
pub fn error_code(error: &Error) -> i64 {
    if error.is_not_found() {
        RESOURCE_NOT_FOUND
    } else if error.is_caller_error() {
        INVALID_PARAMS
    } else {
        INTERNAL_ERROR
    }
}

fn ok_result(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn rpc_error(id: Value, code: i64, message: impl Into<String>, kind: Option<&str>) -> Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(kind) = kind {
        error["data"] = json!({ "kind": kind });
    }
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": error,
    })
}

fn operation_error(id: Value, method: &str, error: &Error) -> Value {
    warn!(method, kind = error.kind(), error = %error, "request failed");
    rpc_error(id, error_code(error), error.to_string(), Some(error.kind()))
}

impl<B: ContentBackend> ContentRepositoryMcp<B> {
    /// Dispatch one JSON-RPC request.
    pub async fn handle_request(&self, request: Value) -> Option<Value> {
        let id = request.get("id").cloned();
        let Some(method) = request.get("method").and_then(Value::as_str) else {
            return Some(rpc_error(id.unwrap_or(Value::Null), INVALID_REQUEST, "missing method", None));
        };
        // Requests without an id are notifications: never answered.
        let id = id?;
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

        let response = match method {
            "initialize" => ok_result(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"resources": {}, "tools": {}},
                    "serverInfo": {
                        "name": self.config().server_name,
                        "version": self.config().server_version,
                    },
                    "instructions": self.instructions(),
                }),
            ),
            "ping" => ok_result(id, json!({})),
            "resources/list" => ok_result(id, json!({ "resources": self.list_resources() })),
            "resources/templates/list" => {
                ok_result(id, json!({ "resourceTemplates": self.list_resource_templates() }))
            }
            "tools/list" => ok_result(id, json!({ "tools": self.list_tools() })),
            "resources/read" => {
                let Some(uri) = params.get("uri").and_then(Value::as_str) else {
                    return Some(rpc_error(id, INVALID_PARAMS, "missing resource uri", None));
                };
                match self.read_resource(uri).await {
                    Ok(contents) => ok_result(id, json!({ "contents": [contents] })),
                    Err(e) => operation_error(id, method, &e),
                }
            }
            "tools/call" => {
                let Some(name) = params.get("name").and_then(Value::as_str) else {
                    return Some(rpc_error(id, INVALID_PARAMS, "missing tool name", None));
                };
                let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                match self.call_tool(name, arguments).await {
                    Ok(result) => ok_result(id, json!(result)),
                    Err(e @ Error::UnknownTool(_)) => operation_error(id, method, &e),
                    Err(e) => {
                        warn!(tool = name, kind = e.kind(), error = %e, "tool failed");
                        ok_result(id, json!(ToolResult::failure(&e)))
                    }
                }
            }
            other => rpc_error(id, METHOD_NOT_FOUND, format!("method not found: {other}"), None),
        };
        Some(response)
    }
}
