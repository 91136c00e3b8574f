//! The agent reasoning loop implementation.
//!
//! One loop instance drives one user turn: ask the model, execute any
//! requested tools, feed the results back, and ask again — up to a hard
//! iteration cap. Tool execution errors come back to the model as
//! error-flagged results; only completion-boundary failures propagate.

use std::sync::Arc;

use chrono::Utc;
use ferrochat_core::error::Error;
use ferrochat_core::event::{DomainEvent, EventBus};
use ferrochat_core::message::Message;
use ferrochat_core::provider::{ChatModel, ChatRequest, ToolChoice, Usage};
use ferrochat_core::tool::ToolCall;
use ferrochat_mcp::ToolRegistry;
use ferrochat_telemetry::{PricingTable, TurnMetrics};
use tracing::{debug, warn};

/// The core loop that orchestrates LLM calls and tool execution.
pub struct AgentLoop {
    /// The completion backend
    model: Arc<dyn ChatModel>,

    /// The model to request
    model_name: String,

    /// Temperature setting
    temperature: f32,

    /// Default max tokens per response
    max_tokens: Option<u32>,

    /// Merged tool namespace
    registry: Arc<ToolRegistry>,

    /// Maximum ask-model/execute-tools alternations per turn
    max_iterations: u32,

    /// Reply used when the cap is hit with no usable text
    fallback_reply: String,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,

    /// Pricing table for cost estimation
    pricing: Arc<PricingTable>,
}

/// Per-turn options.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnOptions {
    /// Mandate a tool call on the first iteration only. Used by
    /// command-triggered flows that must always consult a tool.
    pub force_tool_use: bool,
}

/// What one completed turn yields, beyond the reply itself.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// The final answer text
    pub reply: String,

    /// Tool calls executed across all rounds
    pub tool_calls_executed: u32,

    /// Whether any tool was used this turn
    pub tool_was_used: bool,

    /// Completion rounds performed
    pub iterations: u32,

    /// Token usage summed across rounds
    pub usage: Usage,

    /// Estimated cost in USD for the turn
    pub estimated_cost_usd: f64,

    /// True when the iteration cap cut the turn short
    pub aborted: bool,

    /// Source citations attached by the retrieval pipeline, if any.
    /// Display-only; filled in by the chat service.
    pub citations: Vec<String>,
}

impl AgentLoop {
    pub fn new(
        model: Arc<dyn ChatModel>,
        model_name: impl Into<String>,
        temperature: f32,
        registry: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            temperature,
            max_tokens: None,
            registry,
            max_iterations: 10,
            fallback_reply:
                "I could not finish working through the tools for this request.".into(),
            event_bus,
            pricing: Arc::new(PricingTable::with_defaults()),
        }
    }

    /// Set the maximum number of tool call iterations.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the default max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the reply used when the iteration cap is hit with no text.
    pub fn with_fallback_reply(mut self, reply: impl Into<String>) -> Self {
        self.fallback_reply = reply.into();
        self
    }

    /// Set the pricing table used for cost estimation.
    pub fn with_pricing(mut self, pricing: Arc<PricingTable>) -> Self {
        self.pricing = pricing;
        self
    }

    /// The model this loop requests.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Drive one user turn to completion.
    ///
    /// `messages` is the seeded working list: system prompt, history, and
    /// the (possibly augmented) user turn. The list grows with assistant
    /// and tool messages as the loop runs; the caller decides what of it
    /// to persist.
    pub async fn run_turn(
        &self,
        mut messages: Vec<Message>,
        options: TurnOptions,
    ) -> Result<TurnReport, Error> {
        let tool_definitions = self.registry.definitions();
        let mut metrics = TurnMetrics::start();
        let mut usage = Usage::default();
        let mut last_text: Option<String> = None;
        let mut tool_was_used = false;

        for iteration in 1..=self.max_iterations {
            let tool_choice = if iteration == 1 && options.force_tool_use {
                ToolChoice::Required
            } else {
                ToolChoice::Auto
            };

            debug!(
                iteration,
                max = self.max_iterations,
                ?tool_choice,
                "Agent loop iteration"
            );

            let response = self
                .model
                .complete(ChatRequest {
                    model: self.model_name.clone(),
                    messages: messages.clone(),
                    tools: tool_definitions.clone(),
                    tool_choice,
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                })
                .await?;

            if let Some(round_usage) = &response.usage {
                usage.add(round_usage);
                metrics.record_round(round_usage.prompt_tokens, round_usage.completion_tokens);
            } else {
                metrics.record_round(0, 0);
            }

            // No tool calls — this is the final text response.
            if !response.message.requests_tools() {
                let mut reply = response.message.content.clone();
                messages.push(response.message);

                if reply.trim().is_empty() {
                    reply = self.nudge_final_answer(&mut messages, &mut usage, &mut metrics).await?;
                }

                metrics.finalize_cost(&self.pricing, &self.model_name);
                return Ok(TurnReport {
                    reply,
                    tool_calls_executed: metrics.tool_calls,
                    tool_was_used,
                    iterations: metrics.iterations,
                    usage,
                    estimated_cost_usd: metrics.estimated_cost_usd,
                    aborted: false,
                    citations: Vec::new(),
                });
            }

            // The model wants tools — execute them, in request order.
            tool_was_used = true;
            let requested = response.message.tool_calls.clone();
            if !response.message.content.trim().is_empty() {
                last_text = Some(response.message.content.clone());
            }
            messages.push(response.message);

            debug!(count = requested.len(), "Executing tool calls");

            for tc in &requested {
                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: serde_json::from_str(&tc.arguments)
                        .unwrap_or(serde_json::Value::Object(Default::default())),
                };

                let start = std::time::Instant::now();
                let result = self.registry.call_tool(&call).await;
                let duration_ms = start.elapsed().as_millis() as u64;
                metrics.tool_calls += 1;

                self.event_bus.publish(DomainEvent::ToolExecuted {
                    tool_name: tc.name.clone(),
                    server: self
                        .registry
                        .tools()
                        .iter()
                        .find(|t| t.name == tc.name)
                        .map(|t| t.server.clone())
                        .unwrap_or_default(),
                    success: !result.is_error,
                    duration_ms,
                    timestamp: Utc::now(),
                });

                // Error results go back to the model so it can adapt.
                messages.push(Message::tool_result(&tc.id, &result.content));
            }
        }

        // Cap exceeded — return the best text we saw rather than nothing.
        warn!(
            iterations = self.max_iterations,
            "Max tool iterations reached, aborting turn"
        );
        metrics.finalize_cost(&self.pricing, &self.model_name);
        Ok(TurnReport {
            reply: last_text.unwrap_or_else(|| self.fallback_reply.clone()),
            tool_calls_executed: metrics.tool_calls,
            tool_was_used,
            iterations: metrics.iterations,
            usage,
            estimated_cost_usd: metrics.estimated_cost_usd,
            aborted: true,
            citations: Vec::new(),
        })
    }

    /// The model produced neither text nor tool calls. Ask once, with tools
    /// withheld, for the final answer.
    async fn nudge_final_answer(
        &self,
        messages: &mut Vec<Message>,
        usage: &mut Usage,
        metrics: &mut TurnMetrics,
    ) -> Result<String, Error> {
        debug!("Empty response, forcing final answer");
        messages.push(Message::user(
            "Based on all the information gathered above, provide a complete answer now.",
        ));

        let response = self
            .model
            .complete(ChatRequest {
                model: self.model_name.clone(),
                messages: messages.clone(),
                tools: Vec::new(),
                tool_choice: ToolChoice::None,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            })
            .await?;

        if let Some(round_usage) = &response.usage {
            usage.add(round_usage);
            metrics.prompt_tokens += round_usage.prompt_tokens;
            metrics.completion_tokens += round_usage.completion_tokens;
        }

        let reply = response.message.content.clone();
        messages.push(response.message);
        Ok(reply)
    }
}
