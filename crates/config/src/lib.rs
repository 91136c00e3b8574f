//! Configuration loading, validation, and management for Ferrochat.
//!
//! Loads configuration from `ferrochat.toml` (or the path in
//! `FERROCHAT_CONFIG`) with environment variable overrides for secrets.
//! Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The root configuration structure.
///
/// Maps directly to `ferrochat.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion backend settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool servers to connect at startup
    #[serde(default)]
    pub mcp_servers: Vec<ServerConfig>,

    /// Optional allow-list of tool names handed to the LLM. Empty = no
    /// filter. Exists purely to bound prompt token cost when a backend
    /// exposes far more tools than are relevant.
    #[serde(default)]
    pub essential_tools: Vec<String>,

    /// Per-tool-call timeout in seconds
    #[serde(default = "default_tool_call_timeout")]
    pub tool_call_timeout_secs: u64,

    /// Retrieval pipeline settings
    #[serde(default)]
    pub rag: RagConfig,

    /// Directory for JSON-backed stores (flags, snapshots)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_tool_call_timeout() -> u64 {
    30
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            agent: AgentConfig::default(),
            mcp_servers: Vec::new(),
            essential_tools: Vec::new(),
            tool_call_timeout_secs: default_tool_call_timeout(),
            rag: RagConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("agent", &self.agent)
            .field("mcp_servers", &self.mcp_servers)
            .field("essential_tools", &self.essential_tools)
            .field("tool_call_timeout_secs", &self.tool_call_timeout_secs)
            .field("rag", &self.rag)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

/// Completion backend configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key; usually supplied via environment instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout for one completion call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Agent loop configuration.
///
/// Deployments cap tool-call iterations differently (5–20 observed), so the
/// cap is configuration, not a constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard bound on ask-model/execute-tools alternations per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Maximum stored messages per user before FIFO eviction
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Reply used when the loop aborts with no usable text
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// Static system instructions; the current date is prepended per turn
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_max_history() -> usize {
    50
}
fn default_fallback_reply() -> String {
    "I could not finish working through the tools for this request. Please try rephrasing.".into()
}
fn default_system_prompt() -> String {
    "You are a project consultant. Use the available tools to gather information \
     before answering, and respond in the user's language."
        .into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_history: default_max_history(),
            fallback_reply: default_fallback_reply(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// One tool server to connect at startup.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Unique server name, used in routing and logs
    pub name: String,

    /// How to reach the server
    #[serde(flatten)]
    pub transport: TransportConfig,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("name", &self.name)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Transport binding for a tool server.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Local subprocess speaking newline-delimited JSON-RPC over stdio
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Remote streamable-HTTP endpoint
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_token: Option<String>,
    },
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio { command, args, .. } => f
                .debug_struct("Stdio")
                .field("command", &command)
                .field("args", &args)
                .finish(),
            Self::Http { url, auth_token } => f
                .debug_struct("Http")
                .field("url", &url)
                .field("auth_token", &redact(auth_token))
                .finish(),
        }
    }
}

/// Retrieval pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Ollama-style embedding endpoint
    #[serde(default = "default_embed_url")]
    pub embed_url: String,

    /// Embedding model name
    #[serde(default = "default_embed_model")]
    pub embed_model: String,

    /// Expected embedding dimension
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Candidates fetched from the index before filtering
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Cosine similarity floor for stage-2 filtering
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Chunks kept after reranking
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,

    /// Rerank service endpoint; absent = reranking permanently degraded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_url: Option<String>,

    /// Directory of markdown docs for `reindex`
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    /// Vector file written by `reindex`
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Metadata file written alongside the index, same order
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,

    /// Timeout for one embed/rerank request
    #[serde(default = "default_embed_timeout")]
    pub embed_timeout_secs: u64,
}

fn default_embed_url() -> String {
    "http://localhost:11434".into()
}
fn default_embed_model() -> String {
    "nomic-embed-text".into()
}
fn default_dimension() -> usize {
    768
}
fn default_top_k() -> usize {
    10
}
fn default_similarity_threshold() -> f32 {
    0.71
}
fn default_rerank_top_n() -> usize {
    3
}
fn default_docs_dir() -> PathBuf {
    PathBuf::from("docs")
}
fn default_index_path() -> PathBuf {
    PathBuf::from("data/vector_index.json")
}
fn default_metadata_path() -> PathBuf {
    PathBuf::from("data/vector_metadata.json")
}
fn default_embed_timeout() -> u64 {
    30
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embed_url: default_embed_url(),
            embed_model: default_embed_model(),
            dimension: default_dimension(),
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            rerank_top_n: default_rerank_top_n(),
            rerank_url: None,
            docs_dir: default_docs_dir(),
            index_path: default_index_path(),
            metadata_path: default_metadata_path(),
            embed_timeout_secs: default_embed_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (`ferrochat.toml`, or the
    /// path in `FERROCHAT_CONFIG`).
    ///
    /// Also checks environment variables for the API key:
    /// - `FERROCHAT_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("FERROCHAT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("ferrochat.toml"));
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.provider.api_key.is_none() {
            config.provider.api_key = std::env::var("FERROCHAT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("FERROCHAT_MODEL") {
            config.provider.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.max_history == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_history must be at least 1".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.rag.similarity_threshold) {
            return Err(ConfigError::ValidationError(
                "rag.similarity_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for server in &self.mcp_servers {
            if !seen.insert(server.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate mcp server name '{}'",
                    server.name
                )));
            }
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.agent.max_history, 50);
        assert_eq!(config.rag.top_k, 10);
        assert!((config.rag.similarity_threshold - 0.71).abs() < f32::EPSILON);
        assert_eq!(config.rag.rerank_top_n, 3);
    }

    #[test]
    fn parses_full_toml() {
        let toml_str = r#"
            essential_tools = ["rag_query", "get_file_contents"]
            tool_call_timeout_secs = 60

            [provider]
            api_url = "http://localhost:11434/v1"
            model = "llama3.1:8b"

            [agent]
            max_iterations = 15

            [[mcp_servers]]
            name = "github"
            transport = "http"
            url = "https://api.githubcopilot.com/mcp/"
            auth_token = "ghp_secret"

            [[mcp_servers]]
            name = "docs"
            transport = "stdio"
            command = "python"
            args = ["server.py"]

            [rag]
            similarity_threshold = 0.65
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.max_iterations, 15);
        assert_eq!(config.mcp_servers.len(), 2);
        assert_eq!(config.essential_tools.len(), 2);
        match &config.mcp_servers[0].transport {
            TransportConfig::Http { url, auth_token } => {
                assert!(url.contains("githubcopilot"));
                assert!(auth_token.is_some());
            }
            _ => panic!("expected http transport"),
        }
        match &config.mcp_servers[1].transport {
            TransportConfig::Stdio { command, args, .. } => {
                assert_eq!(command, "python");
                assert_eq!(args, &["server.py"]);
            }
            _ => panic!("expected stdio transport"),
        }
    }

    #[test]
    fn rejects_zero_iterations() {
        let toml_str = r#"
            [agent]
            max_iterations = 0
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let toml_str = r#"
            [rag]
            similarity_threshold = 1.5
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_server_names() {
        let toml_str = r#"
            [[mcp_servers]]
            name = "dup"
            transport = "stdio"
            command = "a"

            [[mcp_servers]]
            name = "dup"
            transport = "stdio"
            command = "b"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/ferrochat.toml")).unwrap();
        assert_eq!(config.provider.model, default_model());
    }

    #[test]
    fn load_from_reads_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "[agent]\nmax_iterations = 5").unwrap();
        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.agent.max_iterations, 5);
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-or-v1-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-or-v1-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
