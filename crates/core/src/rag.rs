//! Retrieval boundaries — embedding and reranking services.
//!
//! Both are remote, both can be down, and neither is allowed to fail a
//! user's turn: the RAG pipeline degrades (skip reranking, or skip RAG
//! entirely) instead of propagating these errors.

use crate::error::{EmbeddingError, RerankError};
use async_trait::async_trait;

/// The embedding boundary: text in, fixed-dimension vector out.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// The embedding model/backend name.
    fn name(&self) -> &str;

    /// The dimension every returned vector must have.
    fn dimension(&self) -> usize;

    /// Embed one text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError>;
}

/// The rerank boundary: cross-encoder relevance scores for (query, text)
/// pairs. Returned scores are in the same order as the input texts.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// The rerank model/backend name.
    fn name(&self) -> &str;

    /// Score each text against the query.
    async fn rerank(
        &self,
        query: &str,
        texts: &[String],
    ) -> std::result::Result<Vec<f32>, RerankError>;
}
