//! Streamable-HTTP transport for remote MCP servers.
//!
//! Each JSON-RPC frame is POSTed to the server endpoint. The server may
//! assign a session via the `Mcp-Session-Id` response header; once seen, the
//! id is replayed on every subsequent request. A 202 status acknowledges a
//! notification with no body.

use async_trait::async_trait;
use ferrochat_core::error::ToolError;
use ferrochat_core::tool::{ToolSchema, ToolServer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, extract_call_text, parse_tool_list};

const SESSION_HEADER: &str = "mcp-session-id";

/// A tool server reached over streamable HTTP.
pub struct HttpToolServer {
    name: String,
    url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
    session_id: Mutex<Option<String>>,
    next_id: AtomicU64,
}

impl HttpToolServer {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        auth_token: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            url: url.into().trim_end_matches('/').to_string(),
            auth_token,
            client,
            session_id: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    async fn send(&self, request: &JsonRpcRequest) -> Result<Option<JsonRpcResponse>, ToolError> {
        let mut builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .json(request);

        if let Some(token) = &self.auth_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        if let Some(session) = self.session_id.lock().await.as_ref() {
            builder = builder.header(SESSION_HEADER, session);
        }

        let response = builder.send().await.map_err(|e| ToolError::ConnectionFailed {
            server: self.name.clone(),
            reason: e.to_string(),
        })?;

        // Capture the session id the first time the server assigns one.
        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            let mut slot = self.session_id.lock().await;
            if slot.as_deref() != Some(session) {
                debug!(server = %self.name, "Received MCP session id");
                *slot = Some(session.to_string());
            }
        }

        let status = response.status();

        // Notification accepted, no body.
        if status.as_u16() == 202 {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Protocol(format!(
                "HTTP {status}: {body}",
                status = status.as_u16()
            )));
        }

        let body = response.text().await.map_err(|e| ToolError::ConnectionFailed {
            server: self.name.clone(),
            reason: e.to_string(),
        })?;

        let parsed: JsonRpcResponse = parse_response_body(&body)
            .ok_or_else(|| ToolError::Protocol(format!("unparseable response body: {body:.120}")))?;

        Ok(Some(parsed))
    }

    async fn request(&self, build: impl FnOnce(u64) -> JsonRpcRequest) -> Result<serde_json::Value, ToolError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let request = build(id);
        match self.send(&request).await? {
            Some(response) => response.into_result(),
            None => Err(ToolError::Protocol("expected a response, got 202".into())),
        }
    }
}

/// Parse a response body that is either plain JSON or a server-sent-event
/// stream carrying JSON in `data:` lines.
fn parse_response_body(body: &str) -> Option<JsonRpcResponse> {
    if let Ok(parsed) = serde_json::from_str(body) {
        return Some(parsed);
    }
    for line in body.lines() {
        if let Some(data) = line.strip_prefix("data:") {
            if let Ok(parsed) = serde_json::from_str(data.trim()) {
                return Some(parsed);
            }
        }
    }
    None
}

#[async_trait]
impl ToolServer for HttpToolServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), ToolError> {
        self.request(JsonRpcRequest::initialize).await?;
        // The initialized notification expects no response (202).
        self.send(&JsonRpcRequest::notification("notifications/initialized"))
            .await?;
        debug!(server = %self.name, "HTTP session initialized");
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolSchema>, ToolError> {
        let result = self.request(JsonRpcRequest::list_tools).await?;
        parse_tool_list(&result)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
        timeout: Duration,
    ) -> Result<String, ToolError> {
        let call = tokio::time::timeout(
            timeout,
            self.request(|id| JsonRpcRequest::call_tool(id, name, arguments)),
        );

        match call.await {
            Ok(result) => extract_call_text(&result?),
            Err(_) => Err(ToolError::Timeout {
                tool_name: name.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}
