//! Index building — the explicit "reindex" operation.
//!
//! Reads every markdown file in the docs directory, chunks it, embeds each
//! chunk, builds a complete replacement index, persists it, and swaps it
//! in. Embedding failures abort the rebuild (the operator asked for it and
//! should see the failure); the previous index keeps serving throughout.

use chrono::Utc;
use ferrochat_config::RagConfig;
use ferrochat_core::error::Error;
use ferrochat_core::event::{DomainEvent, EventBus};
use ferrochat_core::rag::Embedder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::chunker::{DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS, chunk_paragraphs};
use crate::index::{EmbeddedChunk, SharedIndex, VectorIndex};

pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    index: Arc<SharedIndex>,
    event_bus: Arc<EventBus>,
    docs_dir: PathBuf,
    index_path: PathBuf,
    metadata_path: PathBuf,
}

impl IndexBuilder {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<SharedIndex>,
        event_bus: Arc<EventBus>,
        config: &RagConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            event_bus,
            docs_dir: config.docs_dir.clone(),
            index_path: config.index_path.clone(),
            metadata_path: config.metadata_path.clone(),
        }
    }

    /// Rebuild the index from the docs directory. Returns the chunk count.
    pub async fn reindex(&self) -> Result<usize, Error> {
        let documents = self.read_documents().await?;
        if documents.is_empty() {
            return Err(Error::Internal(format!(
                "no markdown files found in {}",
                self.docs_dir.display()
            )));
        }

        let mut embedded = Vec::new();
        for (source_id, content) in &documents {
            let chunks = chunk_paragraphs(content, DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS);
            debug!(source = %source_id, chunks = chunks.len(), "Chunked document");

            for chunk in chunks {
                let embedding = self.embedder.embed(&chunk).await?;
                embedded.push(EmbeddedChunk {
                    text: chunk,
                    source_id: source_id.clone(),
                    embedding,
                });
            }
        }

        let count = embedded.len();
        let replacement = VectorIndex::build(embedded)?;
        replacement.save(&self.index_path, &self.metadata_path)?;
        self.index.swap(replacement).await;

        info!(
            files = documents.len(),
            chunks = count,
            "Vector index rebuilt"
        );
        self.event_bus.publish(DomainEvent::IndexRebuilt {
            chunks: count,
            timestamp: Utc::now(),
        });

        Ok(count)
    }

    /// Load (filename, content) pairs for every top-level `.md` file.
    async fn read_documents(&self) -> Result<Vec<(String, String)>, Error> {
        let mut entries = tokio::fs::read_dir(&self.docs_dir).await.map_err(|e| {
            Error::Internal(format!(
                "cannot read docs dir {}: {e}",
                self.docs_dir.display()
            ))
        })?;

        let mut documents = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Internal(format!("docs dir read failed: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Internal(format!("cannot read {}: {e}", path.display())))?;
            documents.push((name, content));
        }

        documents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferrochat_core::error::EmbeddingError;
    use tempfile::tempdir;

    /// Embeds text by its length — deterministic and dimension-stable.
    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn name(&self) -> &str {
            "length"
        }
        fn dimension(&self) -> usize {
            2
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn rag_config(dir: &std::path::Path) -> RagConfig {
        RagConfig {
            docs_dir: dir.join("docs"),
            index_path: dir.join("data/index.json"),
            metadata_path: dir.join("data/metadata.json"),
            ..RagConfig::default()
        }
    }

    #[tokio::test]
    async fn reindex_builds_persists_and_swaps() {
        let dir = tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(
            docs.join("timer.md"),
            "The timer module drives work intervals through a state machine.",
        )
        .unwrap();
        std::fs::write(
            docs.join("breaks.md"),
            "Breaks are scheduled between work intervals automatically.",
        )
        .unwrap();
        std::fs::write(docs.join("notes.txt"), "not markdown, ignored").unwrap();

        let config = rag_config(dir.path());
        let shared = Arc::new(SharedIndex::new(VectorIndex::empty()));
        let builder = IndexBuilder::new(
            Arc::new(LengthEmbedder),
            Arc::clone(&shared),
            Arc::new(EventBus::default()),
            &config,
        );

        let count = builder.reindex().await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(shared.snapshot().await.len(), 2);
        assert!(config.index_path.exists());
        assert!(config.metadata_path.exists());

        // The persisted pair reloads as one consistent index.
        let loaded = VectorIndex::load(&config.index_path, &config.metadata_path).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn reindex_publishes_event() {
        let dir = tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("a.md"), "One paragraph long enough to index.").unwrap();

        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let builder = IndexBuilder::new(
            Arc::new(LengthEmbedder),
            Arc::new(SharedIndex::new(VectorIndex::empty())),
            Arc::clone(&bus),
            &rag_config(dir.path()),
        );
        builder.reindex().await.unwrap();

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event.as_ref(),
            DomainEvent::IndexRebuilt { chunks: 1, .. }
        ));
    }

    #[tokio::test]
    async fn empty_docs_dir_fails_loudly() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();

        let builder = IndexBuilder::new(
            Arc::new(LengthEmbedder),
            Arc::new(SharedIndex::new(VectorIndex::empty())),
            Arc::new(EventBus::default()),
            &rag_config(dir.path()),
        );
        assert!(builder.reindex().await.is_err());
    }

    #[tokio::test]
    async fn old_index_survives_failed_rebuild() {
        let dir = tempdir().unwrap();
        // docs dir missing entirely — read fails before any swap
        let shared = Arc::new(SharedIndex::new(
            VectorIndex::build(vec![EmbeddedChunk {
                text: "existing".into(),
                source_id: "old.md".into(),
                embedding: vec![1.0, 0.0],
            }])
            .unwrap(),
        ));
        let builder = IndexBuilder::new(
            Arc::new(LengthEmbedder),
            Arc::clone(&shared),
            Arc::new(EventBus::default()),
            &rag_config(dir.path()),
        );

        assert!(builder.reindex().await.is_err());
        assert_eq!(shared.snapshot().await.len(), 1);
    }
}
