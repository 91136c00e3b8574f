//! Ollama embeddings client.
//!
//! POSTs `{model, prompt}` to `/api/embeddings` and returns the vector.
//! The dimension is checked against configuration so a model swap cannot
//! silently poison the index with incompatible vectors.

use async_trait::async_trait;
use ferrochat_core::error::EmbeddingError;
use ferrochat_core::rag::Embedder;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimension,
            client,
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingBody {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": text,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    EmbeddingError::Unreachable(format!("cannot connect to {}", self.base_url))
                } else {
                    EmbeddingError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::RequestFailed(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let body: EmbeddingBody = response
            .json()
            .await
            .map_err(|e| EmbeddingError::RequestFailed(format!("malformed body: {e}")))?;

        if body.embedding.len() != self.dimension {
            return Err(EmbeddingError::Dimension {
                expected: self.dimension,
                actual: body.embedding.len(),
            });
        }

        debug!(model = %self.model, chars = text.len(), "Embedded text");
        Ok(body.embedding)
    }
}
