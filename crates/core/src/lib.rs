//! # Ferrochat Core
//!
//! Domain types, traits, and error definitions for the Ferrochat
//! conversational orchestration runtime. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external boundary is defined as a trait here. Implementations live
//! in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod rag;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, MessageToolCall, Role, UserId};
pub use provider::{ChatModel, ChatRequest, ChatResponse, ToolChoice, ToolDefinition, Usage};
pub use rag::{Embedder, Reranker};
pub use store::KeyValueStore;
pub use tool::{ToolCall, ToolDescriptor, ToolResult, ToolSchema, ToolServer};
