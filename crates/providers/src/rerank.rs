//! HTTP rerank service client.
//!
//! Cross-encoder scoring of (query, document) pairs corrects for the gap
//! between embedding similarity and true relevance. The service is
//! optional: when it is not configured or not reachable, the RAG pipeline
//! falls back to similarity order.

use async_trait::async_trait;
use ferrochat_core::error::RerankError;
use ferrochat_core::rag::Reranker;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub struct HttpReranker {
    url: String,
    client: reqwest::Client,
}

impl HttpReranker {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            url: url.into(),
            client,
        }
    }
}

#[derive(Deserialize)]
struct RerankBody {
    scores: Vec<f32>,
}

#[async_trait]
impl Reranker for HttpReranker {
    fn name(&self) -> &str {
        "http-reranker"
    }

    async fn rerank(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, RerankError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "query": query,
                "documents": texts,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RerankError::Unavailable(format!("cannot connect to {}", self.url))
                } else {
                    RerankError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RerankError::RequestFailed(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let body: RerankBody = response
            .json()
            .await
            .map_err(|e| RerankError::RequestFailed(format!("malformed body: {e}")))?;

        if body.scores.len() != texts.len() {
            return Err(RerankError::ScoreMismatch {
                documents: texts.len(),
                scores: body.scores.len(),
            });
        }

        debug!(documents = texts.len(), "Reranked documents");
        Ok(body.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let reranker = HttpReranker::new("http://127.0.0.1:1/rerank", Duration::from_millis(100));
        let scores = reranker.rerank("query", &[]).await.unwrap();
        assert!(scores.is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_maps_to_unavailable() {
        let reranker = HttpReranker::new("http://127.0.0.1:1/rerank", Duration::from_millis(200));
        let err = reranker
            .rerank("query", &["doc".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RerankError::Unavailable(_) | RerankError::RequestFailed(_)
        ));
    }
}
