//! Service clients for Ferrochat's external AI boundaries.
//!
//! - `openai_compat` — chat completions against any OpenAI-compatible
//!   endpoint (OpenRouter, Ollama, vLLM, ...)
//! - `ollama` — embeddings via the Ollama embeddings API
//! - `rerank` — cross-encoder relevance scores via an HTTP rerank service

pub mod ollama;
pub mod openai_compat;
pub mod rerank;

pub use ollama::OllamaEmbedder;
pub use openai_compat::OpenAiCompatClient;
pub use rerank::HttpReranker;
