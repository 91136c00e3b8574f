//! Service wiring — every component is constructed once here and handed to
//! the commands by reference. No module-level singletons.

use std::sync::Arc;
use std::time::Duration;

use ferrochat_agent::{AgentLoop, ChatService};
use ferrochat_config::AppConfig;
use ferrochat_core::event::EventBus;
use ferrochat_mcp::ToolRegistry;
use ferrochat_memory::{ConversationStore, FlagStore, JsonFileStore};
use ferrochat_providers::{HttpReranker, OllamaEmbedder, OpenAiCompatClient};
use ferrochat_rag::{IndexBuilder, RagPipeline, SharedIndex, VectorIndex};
use ferrochat_telemetry::PricingTable;
use tracing::{info, warn};

pub struct Runtime {
    pub config: AppConfig,
    pub registry: Arc<ToolRegistry>,
    pub index: Arc<SharedIndex>,
    pub embedder: Arc<OllamaEmbedder>,
    pub event_bus: Arc<EventBus>,
}

impl Runtime {
    /// Load config and bring up the shared components.
    pub async fn bring_up() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

        let registry = Arc::new(
            ToolRegistry::connect(
                &config.mcp_servers,
                config.essential_tools.clone(),
                Duration::from_secs(config.tool_call_timeout_secs),
            )
            .await,
        );

        let index = match VectorIndex::load(&config.rag.index_path, &config.rag.metadata_path) {
            Ok(index) => Arc::new(SharedIndex::new(index)),
            Err(e) => {
                warn!(error = %e, "No usable vector index on disk, starting empty; run `ferrochat reindex`");
                Arc::new(SharedIndex::new(VectorIndex::empty()))
            }
        };

        let embedder = Arc::new(OllamaEmbedder::new(
            &config.rag.embed_url,
            &config.rag.embed_model,
            config.rag.dimension,
            Duration::from_secs(config.rag.embed_timeout_secs),
        ));

        Ok(Self {
            config,
            registry,
            index,
            embedder,
            event_bus: Arc::new(EventBus::default()),
        })
    }

    /// Build the chat service on top of the shared components.
    pub fn chat_service(&self) -> Result<ChatService, Box<dyn std::error::Error>> {
        if self.config.provider.api_key.is_none() {
            return Err(concat!(
                "No API key configured. Set OPENROUTER_API_KEY or FERROCHAT_API_KEY, ",
                "or add provider.api_key to ferrochat.toml."
            )
            .into());
        }

        let model = Arc::new(OpenAiCompatClient::from_config(&self.config.provider));

        let reranker = self.config.rag.rerank_url.as_ref().map(|url| {
            Arc::new(HttpReranker::new(
                url,
                Duration::from_secs(self.config.rag.embed_timeout_secs),
            )) as Arc<dyn ferrochat_core::rag::Reranker>
        });

        let pipeline = Arc::new(RagPipeline::new(
            Arc::clone(&self.embedder) as Arc<dyn ferrochat_core::rag::Embedder>,
            reranker,
            Arc::clone(&self.index),
            &self.config.rag,
        ));

        let agent = AgentLoop::new(
            model,
            &self.config.provider.model,
            self.config.provider.temperature,
            Arc::clone(&self.registry),
            Arc::clone(&self.event_bus),
        )
        .with_max_iterations(self.config.agent.max_iterations)
        .with_max_tokens(self.config.provider.max_tokens)
        .with_fallback_reply(&self.config.agent.fallback_reply)
        .with_pricing(Arc::new(PricingTable::with_defaults()));

        info!(
            model = %self.config.provider.model,
            max_iterations = self.config.agent.max_iterations,
            tools = self.registry.tools().len(),
            "Chat service ready"
        );

        Ok(ChatService::new(
            agent,
            Arc::new(ConversationStore::new(self.config.agent.max_history)),
            self.rag_flags(),
            Some(pipeline),
            Arc::clone(&self.event_bus),
            self.config.agent.system_prompt.clone(),
        ))
    }

    /// The persisted per-user RAG flag store.
    pub fn rag_flags(&self) -> FlagStore {
        FlagStore::new(
            "rag",
            Arc::new(JsonFileStore::new(
                self.config.data_dir.join("rag_state.json"),
            )),
        )
    }

    /// The index builder for the reindex command.
    pub fn index_builder(&self) -> IndexBuilder {
        IndexBuilder::new(
            Arc::clone(&self.embedder) as Arc<dyn ferrochat_core::rag::Embedder>,
            Arc::clone(&self.index),
            Arc::clone(&self.event_bus),
            &self.config.rag,
        )
    }
}
