//! The tool registry — one flat namespace over N tool servers.
//!
//! Connection failures are isolated per server: an unreachable server logs a
//! warning and its tools are simply absent from the merged list. Tool
//! execution errors (unknown name, timeout, remote failure) are folded into
//! error-flagged `ToolResult`s so the agent loop can hand them back to the
//! model instead of crashing the turn.

use ferrochat_config::{ServerConfig, TransportConfig};
use ferrochat_core::error::ToolError;
use ferrochat_core::provider::ToolDefinition;
use ferrochat_core::tool::{ToolCall, ToolDescriptor, ToolResult, ToolServer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::http::HttpToolServer;
use crate::stdio::StdioToolServer;
use crate::validate::validate_arguments;

/// The merged tool namespace with name→server routing.
pub struct ToolRegistry {
    servers: HashMap<String, Arc<dyn ToolServer>>,
    tools: Vec<ToolDescriptor>,
    /// tool name → owning server name
    routes: HashMap<String, String>,
    /// Allow-list of tool names handed to the LLM; empty = no filter
    essential: Vec<String>,
    call_timeout: Duration,
}

impl ToolRegistry {
    /// Connect every configured server and merge their tool lists.
    ///
    /// Each connection failure is isolated: the server is skipped with a
    /// warning and never aborts startup of the others. Returns once all
    /// configured servers have been attempted.
    pub async fn connect(
        configs: &[ServerConfig],
        essential: Vec<String>,
        call_timeout: Duration,
    ) -> Self {
        let mut registry = Self {
            servers: HashMap::new(),
            tools: Vec::new(),
            routes: HashMap::new(),
            essential,
            call_timeout,
        };

        info!(servers = configs.len(), "Connecting MCP servers");

        for config in configs {
            let server: Arc<dyn ToolServer> = match &config.transport {
                TransportConfig::Stdio { command, args, env } => {
                    match StdioToolServer::spawn(&config.name, command, args, env) {
                        Ok(s) => Arc::new(s),
                        Err(e) => {
                            warn!(server = %config.name, error = %e, "Skipping unreachable server");
                            continue;
                        }
                    }
                }
                TransportConfig::Http { url, auth_token } => {
                    Arc::new(HttpToolServer::new(&config.name, url, auth_token.clone()))
                }
            };

            if let Err(e) = registry.register(server).await {
                warn!(server = %config.name, error = %e, "Skipping unreachable server");
            }
        }

        info!(
            servers = registry.servers.len(),
            tools = registry.tools.len(),
            "Tool registry ready"
        );
        registry
    }

    /// Initialize one server and merge its advertised tools.
    ///
    /// A tool name already claimed by an earlier server keeps its first
    /// owner; the collision is a configuration error and is logged as such.
    pub async fn register(&mut self, server: Arc<dyn ToolServer>) -> Result<(), ToolError> {
        server.initialize().await?;
        let schemas = server.list_tools().await?;
        let server_name = server.name().to_string();

        debug!(
            server = %server_name,
            tools = schemas.len(),
            names = ?schemas.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "Fetched tools"
        );

        for schema in schemas {
            if let Some(owner) = self.routes.get(&schema.name) {
                warn!(
                    tool = %schema.name,
                    first = %owner,
                    second = %server_name,
                    "Duplicate tool name across servers; keeping the first owner"
                );
                continue;
            }

            self.routes.insert(schema.name.clone(), server_name.clone());
            self.tools.push(ToolDescriptor {
                name: schema.name,
                description: schema.description,
                input_schema: schema.input_schema,
                server: server_name.clone(),
            });
        }

        self.servers.insert(server_name, server);
        Ok(())
    }

    /// The merged tool list, filtered by the essential-tools allow-list
    /// when one is configured.
    pub fn tools(&self) -> Vec<&ToolDescriptor> {
        self.tools
            .iter()
            .filter(|t| self.essential.is_empty() || self.essential.contains(&t.name))
            .collect()
    }

    /// Definitions for the LLM, in merge order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools().iter().map(|t| t.definition()).collect()
    }

    /// Number of connected servers.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Execute a tool call, routing to the owning server.
    ///
    /// Never returns an error: unknown names, argument mismatches, timeouts,
    /// and remote failures all come back as an error-flagged result whose
    /// content is the error text.
    pub async fn call_tool(&self, call: &ToolCall) -> ToolResult {
        let Some(owner) = self.routes.get(&call.name) else {
            warn!(tool = %call.name, "Requested tool not advertised by any server");
            return ToolResult::error(
                &call.id,
                format!("Tool not found: {}", call.name),
            );
        };

        // routes and servers are built together; a route always has a server
        let Some(server) = self.servers.get(owner) else {
            return ToolResult::error(
                &call.id,
                format!("Server {owner} not available"),
            );
        };

        if let Some(descriptor) = self.tools.iter().find(|t| t.name == call.name) {
            if let Err(e) = validate_arguments(&descriptor.input_schema, &call.arguments) {
                warn!(tool = %call.name, error = %e, "Rejected tool arguments before dispatch");
                return ToolResult::error(&call.id, e.to_string());
            }
        }

        debug!(tool = %call.name, server = %owner, "Dispatching tool call");

        match server
            .call_tool(&call.name, call.arguments.clone(), self.call_timeout)
            .await
        {
            Ok(content) => ToolResult::ok(&call.id, content),
            Err(e) => {
                warn!(tool = %call.name, server = %owner, error = %e, "Tool call failed");
                ToolResult::error(&call.id, format!("Error: {e}"))
            }
        }
    }
}
