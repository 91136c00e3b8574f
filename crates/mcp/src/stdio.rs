//! Stdio transport — a tool server running as a managed child process.
//!
//! The server speaks newline-delimited JSON-RPC over its stdin/stdout; its
//! stderr is passed through for operator visibility. The child is spawned
//! with `kill_on_drop`, so it is terminated on every exit path, including
//! panics — a dead registry never leaks subprocesses. Restart only happens
//! on explicit operator action (process restart), never mid-session.

use async_trait::async_trait;
use ferrochat_core::error::ToolError;
use ferrochat_core::tool::{ToolSchema, ToolServer};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, parse_tool_list};

#[derive(Debug)]
struct StdioIo {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

/// A tool server reached over a child process's stdio.
#[derive(Debug)]
pub struct StdioToolServer {
    name: String,
    io: Mutex<StdioIo>,
}

impl StdioToolServer {
    /// Spawn the server process. Fails if the binary cannot be started or
    /// its pipes cannot be taken.
    pub fn spawn(
        name: impl Into<String>,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self, ToolError> {
        let name = name.into();

        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| ToolError::ConnectionFailed {
            server: name.clone(),
            reason: format!("failed to spawn '{command}': {e}"),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| ToolError::ConnectionFailed {
            server: name.clone(),
            reason: "child stdin unavailable".into(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ToolError::ConnectionFailed {
            server: name.clone(),
            reason: "child stdout unavailable".into(),
        })?;

        debug!(server = %name, command, "Spawned stdio tool server");

        Ok(Self {
            name,
            io: Mutex::new(StdioIo {
                child,
                stdin,
                lines: BufReader::new(stdout).lines(),
                next_id: 0,
            }),
        })
    }

    /// Send one request and wait for the response with a matching id.
    ///
    /// Non-matching frames (server notifications, late replies from calls
    /// that already timed out) are skipped, so a timed-out call does not
    /// desync the stream for the next one. Garbage lines are tolerated.
    async fn request(&self, build: impl FnOnce(u64) -> JsonRpcRequest) -> Result<serde_json::Value, ToolError> {
        let mut io = self.io.lock().await;
        io.next_id += 1;
        let id = io.next_id;
        let request = build(id);

        let mut line = serde_json::to_string(&request)
            .map_err(|e| ToolError::Protocol(format!("failed to encode request: {e}")))?;
        line.push('\n');

        io.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| self.closed(format!("write failed: {e}")))?;
        io.stdin
            .flush()
            .await
            .map_err(|e| self.closed(format!("flush failed: {e}")))?;

        loop {
            let frame = io
                .lines
                .next_line()
                .await
                .map_err(|e| self.closed(format!("read failed: {e}")))?
                .ok_or_else(|| self.closed("server closed stdout".into()))?;

            if frame.trim().is_empty() {
                continue;
            }

            let response: JsonRpcResponse = match serde_json::from_str(&frame) {
                Ok(r) => r,
                Err(e) => {
                    warn!(server = %self.name, error = %e, "Skipping unparseable frame");
                    continue;
                }
            };

            match response.id {
                Some(rid) if rid == id => return response.into_result(),
                _ => {
                    debug!(server = %self.name, "Skipping frame with foreign or absent id");
                }
            }
        }
    }

    /// Fire a notification — no response expected.
    async fn notify(&self, method: &str) -> Result<(), ToolError> {
        let mut io = self.io.lock().await;
        let request = JsonRpcRequest::notification(method);
        let mut line = serde_json::to_string(&request)
            .map_err(|e| ToolError::Protocol(format!("failed to encode notification: {e}")))?;
        line.push('\n');
        io.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| self.closed(format!("write failed: {e}")))?;
        io.stdin
            .flush()
            .await
            .map_err(|e| self.closed(format!("flush failed: {e}")))?;
        Ok(())
    }

    fn closed(&self, reason: String) -> ToolError {
        ToolError::ConnectionFailed {
            server: self.name.clone(),
            reason,
        }
    }

    /// Whether the child process is still running.
    pub async fn is_alive(&self) -> bool {
        let mut io = self.io.lock().await;
        matches!(io.child.try_wait(), Ok(None))
    }
}

#[async_trait]
impl ToolServer for StdioToolServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), ToolError> {
        self.request(JsonRpcRequest::initialize).await?;
        self.notify("notifications/initialized").await?;
        debug!(server = %self.name, "Stdio session initialized");
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
            Ok(result) => crate::protocol::extract_call_text(&result?),
            Err(_) => Err(ToolError::Timeout {
                tool_name: name.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}
