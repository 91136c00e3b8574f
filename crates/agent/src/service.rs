//! The per-user chat service around the agent loop.
//!
//! Owns the pieces a single user turn needs: conversation history, the
//! per-user lock discipline, the RAG toggle and pipeline, and system
//! prompt synthesis. Every dependency is injected at construction; there
//! is no module-level state.

use std::sync::Arc;

use chrono::Utc;
use ferrochat_core::error::Error;
use ferrochat_core::event::{DomainEvent, EventBus};
use ferrochat_core::message::{Message, UserId};
use ferrochat_memory::{ConversationStore, FlagStore, UserLocks};
use ferrochat_rag::RagPipeline;
use tracing::{debug, info};

use crate::loop_runner::{AgentLoop, TurnOptions, TurnReport};

pub struct ChatService {
    agent: AgentLoop,
    conversations: Arc<ConversationStore>,
    locks: UserLocks,
    rag_flags: FlagStore,
    rag: Option<Arc<RagPipeline>>,
    event_bus: Arc<EventBus>,
    /// Static instruction block; the current date is prepended per turn
    system_instructions: String,
}

impl ChatService {
    pub fn new(
        agent: AgentLoop,
        conversations: Arc<ConversationStore>,
        rag_flags: FlagStore,
        rag: Option<Arc<RagPipeline>>,
        event_bus: Arc<EventBus>,
        system_instructions: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            conversations,
            locks: UserLocks::new(),
            rag_flags,
            rag,
            event_bus,
            system_instructions: system_instructions.into(),
        }
    }

    /// Handle one user turn with default options.
    pub async fn handle_message(&self, user: &UserId, text: &str) -> Result<TurnReport, Error> {
        self.handle_message_with(user, text, TurnOptions::default())
            .await
    }

    /// Handle one user turn.
    ///
    /// Same-user turns are serialized; different users run in parallel.
    /// When the user's RAG flag is on, the query sent to the model is the
    /// augmented variant — but history always records the original text.
    pub async fn handle_message_with(
        &self,
        user: &UserId,
        text: &str,
        options: TurnOptions,
    ) -> Result<TurnReport, Error> {
        let _guard = self.locks.acquire(user).await;

        info!(user = %user, chars = text.len(), "Processing message");

        // RAG augmentation applies to this turn's model input only.
        let mut model_input = text.to_string();
        let mut citations = Vec::new();
        if let Some(pipeline) = &self.rag {
            if self.rag_flags.is_enabled(user).await {
                let augmentation = pipeline.augment(text).await;
                if augmentation.used_rag {
                    debug!(
                        user = %user,
                        citations = augmentation.citations.len(),
                        "Query augmented with context"
                    );
                }
                model_input = augmentation.text;
                citations = augmentation.citations;
            }
        }

        // System prompt is synthesized fresh each turn, never stored.
        let mut messages = vec![Message::system(self.system_prompt())];
        messages.extend(self.conversations.history(user).await);
        messages.push(Message::user(model_input));

        let mut report = self.agent.run_turn(messages, options).await?;
        report.citations = citations;

        // Persist the original turn, not the augmented variant.
        self.conversations.append(user, Message::user(text)).await;
        self.conversations
            .append(user, Message::assistant(&report.reply))
            .await;

        self.event_bus.publish(DomainEvent::TurnCompleted {
            user_id: user.to_string(),
            model: self.agent_model_name().to_string(),
            iterations: report.iterations,
            tool_calls: report.tool_calls_executed,
            tokens_used: report.usage.total_tokens,
            aborted: report.aborted,
            timestamp: Utc::now(),
        });

        info!(
            user = %user,
            iterations = report.iterations,
            tool_calls = report.tool_calls_executed,
            aborted = report.aborted,
            "Turn completed"
        );

        Ok(report)
    }

    /// Reset the user's conversation.
    pub async fn clear_history(&self, user: &UserId) {
        self.conversations.clear(user).await;
    }

    /// Toggle the user's RAG flag.
    pub async fn set_rag_enabled(&self, user: &UserId, enabled: bool) -> Result<(), Error> {
        self.rag_flags.set_enabled(user, enabled).await?;
        Ok(())
    }

    /// Whether RAG is enabled for the user.
    pub async fn rag_enabled(&self, user: &UserId) -> bool {
        self.rag_flags.is_enabled(user).await
    }

    fn system_prompt(&self) -> String {
        format!(
            "Current date: {}. All dates must be calculated relative to this date.\n\n{}",
            Utc::now().format("%Y-%m-%d"),
            self.system_instructions
        )
    }

    fn agent_model_name(&self) -> &str {
        self.agent.model_name()
    }
}
