//! Tool types and the tool-server boundary.
//!
//! Tools are advertised by external MCP servers, merged into one flat
//! namespace by the registry, and executed by routing each call back to the
//! server that owns the name.

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A tool as advertised by a server, before merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// JSON Schema for the tool's arguments
    #[serde(rename = "inputSchema", default)]
    pub input_schema: serde_json::Value,
}

/// A tool in the merged namespace, annotated with its owning server.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// Globally unique tool name (post-merge invariant)
    pub name: String,

    pub description: String,

    /// JSON Schema for the tool's arguments
    pub input_schema: serde_json::Value,

    /// Name of the server that advertises this tool
    pub server: String,
}

impl ToolDescriptor {
    /// Lower to the provider-facing definition sent to the LLM.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.clone(),
        }
    }
}

/// A request to execute a tool. Transient — lives for one loop round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
///
/// Errors are folded into the result (`is_error` + error text as content) so
/// the model can read them and adapt, rather than crashing the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// The output content (or error text)
    pub content: String,

    /// Whether the execution failed
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// The tool-server boundary, uniform regardless of transport.
///
/// Two bindings exist: a local subprocess speaking newline-delimited
/// JSON-RPC over stdio, and a remote streamable-HTTP endpoint. Both expose
/// the identical operations below to the registry.
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// The configured server name.
    fn name(&self) -> &str;

    /// Run the protocol handshake. Must be called before the other methods.
    async fn initialize(&self) -> std::result::Result<(), ToolError>;

    /// Fetch the tools this server advertises.
    async fn list_tools(&self) -> std::result::Result<Vec<ToolSchema>, ToolError>;

    /// Execute a tool, bounded by `timeout`. Returns the text content of
    /// the result; protocol/transport failures surface as `ToolError`.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
        timeout: Duration,
    ) -> std::result::Result<String, ToolError>;
}
