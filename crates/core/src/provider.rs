//! ChatModel trait — the abstraction over LLM completion backends.
//!
//! A ChatModel knows how to send a message list (plus available tools) to an
//! LLM and get one assistant turn back. The agent loop calls `complete()`
//! once per iteration without knowing which backend is wired in.

use crate::error::ProviderError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// How strongly the model is steered toward tool use for one request.
///
/// `Required` is used for the first round of command-triggered flows that
/// must always consult a tool; later rounds fall back to `Auto`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides whether to call a tool
    #[default]
    Auto,
    /// The model must produce at least one tool call
    Required,
    /// Tools are withheld entirely
    None,
}

/// One completion request — exactly one per loop iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g., "anthropic/claude-sonnet-4")
    pub model: String,

    /// The working message list: system + history + current turn
    pub messages: Vec<Message>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Tool-use steering for this request
    #[serde(default)]
    pub tool_choice: ToolChoice,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A complete response from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated assistant message (text and/or tool-call requests)
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Accumulate another round's usage into this one.
    pub fn add(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// The completion boundary.
///
/// One blocking (suspendable) call per loop iteration. Implementations:
/// OpenAI-compatible endpoints (OpenRouter, Ollama, vLLM, ...).
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// A human-readable name for this backend (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get a complete assistant turn.
    async fn complete(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<ChatResponse, ProviderError>;
}
