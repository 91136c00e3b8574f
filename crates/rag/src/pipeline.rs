//! The four-stage retrieve-and-rerank pipeline.
//!
//! 1. embed the query
//! 2. search the index, drop chunks below the similarity threshold
//! 3. rerank the survivors with a cross-encoder, keep the top N
//! 4. wrap the selected chunks and the original query into one augmented
//!    query string
//!
//! Every stage degrades instead of failing: an unreachable embedding
//! service skips RAG for the turn, an unavailable reranker keeps the
//! similarity ordering, and zero surviving chunks is a designed outcome,
//! not an error. `augment` never returns an error to the caller.

use ferrochat_config::RagConfig;
use ferrochat_core::rag::{Embedder, Reranker};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::index::{IndexedChunk, SharedIndex};

/// The outcome of one augmentation attempt.
#[derive(Debug, Clone)]
pub struct Augmentation {
    /// What to actually send to the model. Equals the original query when
    /// the pipeline degraded all the way out.
    pub text: String,

    /// Whether any retrieved context made it into `text`
    pub used_rag: bool,

    /// Deduplicated `source: "preview..."` citations for the chunks used.
    /// Display-only — never persisted to history.
    pub citations: Vec<String>,
}

impl Augmentation {
    fn passthrough(query: &str) -> Self {
        Self {
            text: query.to_string(),
            used_rag: false,
            citations: Vec::new(),
        }
    }
}

pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    reranker: Option<Arc<dyn Reranker>>,
    index: Arc<SharedIndex>,
    top_k: usize,
    similarity_threshold: f32,
    rerank_top_n: usize,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        reranker: Option<Arc<dyn Reranker>>,
        index: Arc<SharedIndex>,
        config: &RagConfig,
    ) -> Self {
        Self {
            embedder,
            reranker,
            index,
            top_k: config.top_k,
            similarity_threshold: config.similarity_threshold,
            rerank_top_n: config.rerank_top_n,
        }
    }

    /// Produce a context-augmented variant of `query`, or the original
    /// query unchanged if any stage degrades out. Infallible by design.
    pub async fn augment(&self, query: &str) -> Augmentation {
        // ── Stage 1: embed ──
        let embedding = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Query embedding failed, sending unaugmented query");
                return Augmentation::passthrough(query);
            }
        };

        // ── Stage 2: retrieve + filter ──
        let index = self.index.snapshot().await;
        let candidates = index.search(&embedding, self.top_k);
        let filtered: Vec<(IndexedChunk, f32)> = candidates
            .into_iter()
            .filter(|(_, score)| *score >= self.similarity_threshold)
            .collect();

        if filtered.is_empty() {
            debug!(
                threshold = self.similarity_threshold,
                "No chunks above similarity threshold"
            );
            return Augmentation::passthrough(query);
        }

        debug!(
            retrieved = filtered.len(),
            top_score = filtered[0].1,
            "Chunks passed similarity filter"
        );

        // ── Stage 3: rerank ──
        let selected = self.rerank_or_fallback(query, filtered).await;

        // ── Stage 4: augment ──
        let context = selected
            .iter()
            .map(|c| format!("[{}]", c.text))
            .collect::<Vec<_>>()
            .join(" ");

        let citations = Self::citations(&selected);

        Augmentation {
            text: format!("Context: {context}\n\nQuery: {query}"),
            used_rag: true,
            citations,
        }
    }

    /// Keep the rerank-best `rerank_top_n` chunks; with no usable reranker,
    /// keep the similarity-best instead, in unchanged order.
    async fn rerank_or_fallback(
        &self,
        query: &str,
        filtered: Vec<(IndexedChunk, f32)>,
    ) -> Vec<IndexedChunk> {
        let Some(reranker) = &self.reranker else {
            debug!("No reranker configured, keeping similarity order");
            return Self::take_top(filtered, self.rerank_top_n);
        };

        let texts: Vec<String> = filtered.iter().map(|(c, _)| c.text.clone()).collect();
        match reranker.rerank(query, &texts).await {
            Ok(scores) if scores.len() == texts.len() => {
                let mut rescored: Vec<(IndexedChunk, f32)> = filtered
                    .into_iter()
                    .zip(scores)
                    .map(|((chunk, _), score)| (chunk, score))
                    .collect();
                rescored.sort_by(|a, b| {
                    b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
                });
                Self::take_top(rescored, self.rerank_top_n)
            }
            Ok(scores) => {
                warn!(
                    documents = texts.len(),
                    scores = scores.len(),
                    "Reranker returned mismatched score count, keeping similarity order"
                );
                Self::take_top(filtered, self.rerank_top_n)
            }
            Err(e) => {
                warn!(error = %e, "Reranking failed, keeping similarity order");
                Self::take_top(filtered, self.rerank_top_n)
            }
        }
    }

    fn take_top(chunks: Vec<(IndexedChunk, f32)>, n: usize) -> Vec<IndexedChunk> {
        chunks.into_iter().take(n).map(|(c, _)| c).collect()
    }

    /// `source: "preview..."` lines, deduplicated by source, chunk order.
    fn citations(chunks: &[IndexedChunk]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        chunks
            .iter()
            .filter(|c| seen.insert(c.source_id.clone()))
            .map(|c| {
                let preview: String = c.text.chars().take(40).collect();
                format!("{}: \"{}...\"", c.source_id, preview.trim())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{EmbeddedChunk, VectorIndex};
    use async_trait::async_trait;
    use ferrochat_core::error::{EmbeddingError, RerankError};

    /// Embeds every query as [1, 0].
    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }
        fn dimension(&self) -> usize {
            2
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        fn name(&self) -> &str {
            "down"
        }
        fn dimension(&self) -> usize {
            2
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Unreachable("connection refused".into()))
        }
    }

    /// Scores chunks by input position, so the last becomes the best.
    struct ReversingReranker;

    #[async_trait]
    impl Reranker for ReversingReranker {
        fn name(&self) -> &str {
            "reversing"
        }
        async fn rerank(&self, _query: &str, texts: &[String]) -> Result<Vec<f32>, RerankError> {
            Ok((0..texts.len()).map(|i| i as f32).collect())
        }
    }

    struct DownReranker;

    #[async_trait]
    impl Reranker for DownReranker {
        fn name(&self) -> &str {
            "down"
        }
        async fn rerank(&self, _query: &str, _texts: &[String]) -> Result<Vec<f32>, RerankError> {
            Err(RerankError::Unavailable("model not loaded".into()))
        }
    }

    /// A chunk whose cosine similarity against the [1, 0] query is `score`.
    fn chunk_with_score(name: &str, score: f32) -> EmbeddedChunk {
        EmbeddedChunk {
            text: name.to_string(),
            source_id: format!("{name}.md"),
            embedding: vec![score, (1.0 - score * score).sqrt()],
        }
    }

    fn index_with_scores(scores: &[(&str, f32)]) -> Arc<SharedIndex> {
        let chunks = scores
            .iter()
            .map(|(name, score)| chunk_with_score(name, *score))
            .collect();
        Arc::new(SharedIndex::new(VectorIndex::build(chunks).unwrap()))
    }

    fn config() -> RagConfig {
        RagConfig::default() // top_k 10, threshold 0.71, rerank_top_n 3
    }

    #[tokio::test]
    async fn threshold_filters_exactly() {
        // Scores [0.9, 0.75, 0.70, 0.5] with threshold 0.71: two pass.
        let index = index_with_scores(&[
            ("high", 0.9),
            ("mid", 0.75),
            ("low", 0.70),
            ("far", 0.5),
        ]);
        let pipeline = RagPipeline::new(Arc::new(FixedEmbedder), None, index, &config());

        let augmentation = pipeline.augment("what is the timer module?").await;
        assert!(augmentation.used_rag);
        assert!(augmentation.text.contains("[high]"));
        assert!(augmentation.text.contains("[mid]"));
        assert!(!augmentation.text.contains("[low]"));
        assert!(!augmentation.text.contains("[far]"));
    }

    #[tokio::test]
    async fn augmented_query_wraps_original() {
        let index = index_with_scores(&[("ctx", 0.95)]);
        let pipeline = RagPipeline::new(Arc::new(FixedEmbedder), None, index, &config());

        let augmentation = pipeline.augment("original question").await;
        assert_eq!(
            augmentation.text,
            "Context: [ctx]\n\nQuery: original question"
        );
    }

    #[tokio::test]
    async fn embed_failure_passes_query_through() {
        let index = index_with_scores(&[("ctx", 0.95)]);
        let pipeline = RagPipeline::new(Arc::new(DownEmbedder), None, index, &config());

        let augmentation = pipeline.augment("plain question").await;
        assert!(!augmentation.used_rag);
        assert_eq!(augmentation.text, "plain question");
        assert!(augmentation.citations.is_empty());
    }

    #[tokio::test]
    async fn nothing_above_threshold_passes_query_through() {
        let index = index_with_scores(&[("far", 0.3), ("farther", 0.1)]);
        let pipeline = RagPipeline::new(Arc::new(FixedEmbedder), None, index, &config());

        let augmentation = pipeline.augment("unrelated question").await;
        assert!(!augmentation.used_rag);
        assert_eq!(augmentation.text, "unrelated question");
    }

    #[tokio::test]
    async fn reranker_reorders_selection() {
        // Similarity order: a, b, c, d. The reversing reranker scores later
        // positions higher, so the top 3 become d, c, b.
        let index = index_with_scores(&[("a", 0.95), ("b", 0.9), ("c", 0.85), ("d", 0.8)]);
        let pipeline = RagPipeline::new(
            Arc::new(FixedEmbedder),
            Some(Arc::new(ReversingReranker)),
            index,
            &config(),
        );

        let augmentation = pipeline.augment("q").await;
        assert!(augmentation.text.starts_with("Context: [d] [c] [b]"));
        assert!(!augmentation.text.contains("[a]"));
    }

    #[tokio::test]
    async fn rerank_failure_keeps_similarity_order() {
        let index = index_with_scores(&[("a", 0.95), ("b", 0.9), ("c", 0.85), ("d", 0.8)]);
        let pipeline = RagPipeline::new(
            Arc::new(FixedEmbedder),
            Some(Arc::new(DownReranker)),
            index,
            &config(),
        );

        let augmentation = pipeline.augment("q").await;
        // Top-N of the similarity-filtered set, unchanged order.
        assert!(augmentation.text.starts_with("Context: [a] [b] [c]"));
        assert!(!augmentation.text.contains("[d]"));
        assert!(augmentation.used_rag);
    }

    #[tokio::test]
    async fn citations_deduplicate_by_source() {
        let mut chunks = vec![
            chunk_with_score("first chunk of the guide", 0.95),
            chunk_with_score("second chunk of the guide", 0.9),
        ];
        chunks[0].source_id = "guide.md".into();
        chunks[1].source_id = "guide.md".into();
        let index = Arc::new(SharedIndex::new(VectorIndex::build(chunks).unwrap()));
        let pipeline = RagPipeline::new(Arc::new(FixedEmbedder), None, index, &config());

        let augmentation = pipeline.augment("q").await;
        assert_eq!(augmentation.citations.len(), 1);
        assert!(augmentation.citations[0].starts_with("guide.md: "));
    }
}
