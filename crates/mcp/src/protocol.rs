//! JSON-RPC 2.0 framing for the MCP protocol (spec version 2025-03-26).
//!
//! Only the three operations the registry needs: `initialize` (plus the
//! `notifications/initialized` follow-up), `tools/list`, and `tools/call`.

use ferrochat_core::error::ToolError;
use ferrochat_core::tool::ToolSchema;
use serde::{Deserialize, Serialize};

/// The MCP protocol revision we speak.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// An outbound JSON-RPC request or notification.
///
/// Field order is part of the wire contract for line-oriented peers that
/// pattern-match frames, so this stays a struct rather than an ad hoc map.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,

    /// Absent for notifications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    pub method: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn call(id: u64, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            method: method.into(),
            params: Some(params),
        }
    }

    pub fn notification(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method: method.into(),
            params: None,
        }
    }

    /// The `initialize` handshake request.
    pub fn initialize(id: u64) -> Self {
        Self::call(
            id,
            "initialize",
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": "ferrochat",
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        )
    }

    /// The `tools/list` request.
    pub fn list_tools(id: u64) -> Self {
        Self::call(id, "tools/list", serde_json::json!({}))
    }

    /// The `tools/call` request.
    pub fn call_tool(id: u64, name: &str, arguments: serde_json::Value) -> Self {
        Self::call(
            id,
            "tools/call",
            serde_json::json!({ "name": name, "arguments": arguments }),
        )
    }
}

/// An inbound JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<u64>,

    #[serde(default)]
    pub result: Option<serde_json::Value>,

    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    /// Unwrap the result, mapping a JSON-RPC error object to `ToolError`.
    pub fn into_result(self) -> Result<serde_json::Value, ToolError> {
        if let Some(err) = self.error {
            return Err(ToolError::Protocol(format!(
                "JSON-RPC error {}: {}",
                err.code, err.message
            )));
        }
        self.result
            .ok_or_else(|| ToolError::Protocol("response carried neither result nor error".into()))
    }
}

/// Parse a `tools/list` result into tool schemas.
pub fn parse_tool_list(result: &serde_json::Value) -> Result<Vec<ToolSchema>, ToolError> {
    let tools = result
        .get("tools")
        .and_then(|t| t.as_array())
        .ok_or_else(|| ToolError::Protocol("tools/list result missing 'tools' array".into()))?;

    tools
        .iter()
        .map(|t| {
            serde_json::from_value(t.clone())
                .map_err(|e| ToolError::Protocol(format!("malformed tool schema: {e}")))
        })
        .collect()
}

/// Flatten a `tools/call` result's content blocks into one text payload.
///
/// MCP returns `content: [{type: "text", text: ...}, ...]`; non-text blocks
/// are skipped. An `isError: true` result is mapped to `ToolError`.
pub fn extract_call_text(result: &serde_json::Value) -> Result<String, ToolError> {
    let text: String = result
        .get("content")
        .and_then(|c| c.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if result
        .get("isError")
        .and_then(|e| e.as_bool())
        .unwrap_or(false)
    {
        return Err(ToolError::Protocol(if text.is_empty() {
            "tool reported an error with no message".into()
        } else {
            text
        }));
    }

    if text.is_empty() {
        return Ok("No result".into());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_in_declared_order() {
        let req = JsonRpcRequest::initialize(1);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.starts_with(r#"{"jsonrpc":"2.0","id":1,"method":"initialize""#));
        assert!(json.contains(PROTOCOL_VERSION));
    }

    #[test]
    fn notification_has_no_id() {
        let req = JsonRpcRequest::notification("notifications/initialized");
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn response_error_maps_to_tool_error() {
        let resp: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap();
        let err = resp.into_result().unwrap_err();
        assert!(err.to_string().contains("Method not found"));
    }

    #[test]
    fn parses_tool_list() {
        let result = serde_json::json!({
            "tools": [
                {"name": "rag_query", "description": "Semantic search", "inputSchema": {"type": "object"}},
                {"name": "list_specs", "inputSchema": {"type": "object"}}
            ]
        });
        let tools = parse_tool_list(&result).unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "rag_query");
        assert_eq!(tools[1].description, "");
    }

    #[test]
    fn extracts_concatenated_text() {
        let result = serde_json::json!({
            "content": [
                {"type": "text", "text": "part one "},
                {"type": "image", "data": "..."},
                {"type": "text", "text": "part two"}
            ]
        });
        assert_eq!(extract_call_text(&result).unwrap(), "part one part two");
    }

    #[test]
    fn empty_content_reads_as_no_result() {
        let result = serde_json::json!({ "content": [] });
        assert_eq!(extract_call_text(&result).unwrap(), "No result");
    }

    #[test]
    fn is_error_flag_becomes_tool_error() {
        let result = serde_json::json!({
            "content": [{"type": "text", "text": "repository not found"}],
            "isError": true
        });
        let err = extract_call_text(&result).unwrap_err();
        assert!(err.to_string().contains("repository not found"));
    }
}
