//! The vector index: normalized embeddings plus parallel chunk metadata.
//!
//! Inner product on L2-normalized vectors equals cosine similarity, so
//! scores are directly comparable to a fixed threshold across rebuilds.
//! An index is immutable once built; `SharedIndex` swaps complete indexes
//! atomically so readers never observe a half-built one.

use ferrochat_core::error::IndexError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Input to an index build: one chunk with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub text: String,
    pub source_id: String,
    pub embedding: Vec<f32>,
}

/// Metadata stored per vector, addressed by the same position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub text: String,
    pub source_id: String,
}

/// L2-normalize a vector in place; an all-zero vector is left as is.
fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[derive(Serialize, Deserialize)]
struct VectorFile {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

/// An immutable similarity-search index.
#[derive(Debug)]
pub struct VectorIndex {
    vectors: Vec<Vec<f32>>,
    entries: Vec<IndexedChunk>,
    dimension: usize,
}

impl VectorIndex {
    /// An index with no content; every search returns nothing.
    pub fn empty() -> Self {
        Self {
            vectors: Vec::new(),
            entries: Vec::new(),
            dimension: 0,
        }
    }

    /// Build an index from embedded chunks. All embeddings must share one
    /// dimension; vectors are normalized during the build.
    pub fn build(chunks: Vec<EmbeddedChunk>) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::Empty);
        }

        let dimension = chunks[0].embedding.len();
        let mut vectors = Vec::with_capacity(chunks.len());
        let mut entries = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            if chunk.embedding.len() != dimension {
                return Err(IndexError::Dimension {
                    expected: dimension,
                    actual: chunk.embedding.len(),
                });
            }
            let mut vector = chunk.embedding;
            normalize(&mut vector);
            vectors.push(vector);
            entries.push(IndexedChunk {
                text: chunk.text,
                source_id: chunk.source_id,
            });
        }

        debug!(chunks = entries.len(), dimension, "Built vector index");
        Ok(Self {
            vectors,
            entries,
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Top-k nearest chunks by cosine similarity, sorted descending.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(IndexedChunk, f32)> {
        if self.is_empty() || query.len() != self.dimension || k == 0 {
            return Vec::new();
        }

        let mut normalized = query.to_vec();
        normalize(&mut normalized);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let score: f32 = v.iter().zip(&normalized).map(|(a, b)| a * b).sum();
                (i, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| (self.entries[i].clone(), score))
            .collect()
    }

    /// Persist the index as two lock-step JSON files: vectors and metadata.
    pub fn save(&self, index_path: &Path, metadata_path: &Path) -> Result<(), IndexError> {
        for path in [index_path, metadata_path] {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| IndexError::Storage(format!("failed to create index dir: {e}")))?;
            }
        }

        let vector_file = VectorFile {
            dimension: self.dimension,
            vectors: self.vectors.clone(),
        };
        let vectors_json = serde_json::to_string(&vector_file)
            .map_err(|e| IndexError::Storage(e.to_string()))?;
        std::fs::write(index_path, vectors_json)
            .map_err(|e| IndexError::Storage(format!("failed to write index: {e}")))?;

        let metadata_json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| IndexError::Storage(e.to_string()))?;
        std::fs::write(metadata_path, metadata_json)
            .map_err(|e| IndexError::Storage(format!("failed to write metadata: {e}")))?;

        info!(chunks = self.len(), path = %index_path.display(), "Saved vector index");
        Ok(())
    }

    /// Load an index saved by [`save`]. The two files must agree on the
    /// entry count — a mismatch means they drifted apart and neither can
    /// be trusted.
    pub fn load(index_path: &Path, metadata_path: &Path) -> Result<Self, IndexError> {
        let vectors_json = std::fs::read_to_string(index_path)
            .map_err(|e| IndexError::Storage(format!("failed to read index: {e}")))?;
        let vector_file: VectorFile = serde_json::from_str(&vectors_json)
            .map_err(|e| IndexError::Storage(format!("malformed index file: {e}")))?;

        let metadata_json = std::fs::read_to_string(metadata_path)
            .map_err(|e| IndexError::Storage(format!("failed to read metadata: {e}")))?;
        let entries: Vec<IndexedChunk> = serde_json::from_str(&metadata_json)
            .map_err(|e| IndexError::Storage(format!("malformed metadata file: {e}")))?;

        if vector_file.vectors.len() != entries.len() {
            return Err(IndexError::Mismatch {
                vectors: vector_file.vectors.len(),
                entries: entries.len(),
            });
        }

        info!(chunks = entries.len(), path = %index_path.display(), "Loaded vector index");
        Ok(Self {
            vectors: vector_file.vectors,
            entries,
            dimension: vector_file.dimension,
        })
    }
}

/// A swappable handle over the current index.
///
/// `rebuild` callers construct the replacement off to the side and swap it
/// in atomically; the old index keeps serving reads until the swap.
pub struct SharedIndex {
    current: RwLock<Arc<VectorIndex>>,
}

impl SharedIndex {
    pub fn new(index: VectorIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    /// The current index snapshot. Holders keep a consistent view even
    /// across a concurrent swap.
    pub async fn snapshot(&self) -> Arc<VectorIndex> {
        Arc::clone(&*self.current.read().await)
    }

    /// Replace the index wholesale.
    pub async fn swap(&self, replacement: VectorIndex) {
        let mut current = self.current.write().await;
        *current = Arc::new(replacement);
    }
}
