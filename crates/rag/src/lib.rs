//! Retrieval-augmented generation for Ferrochat.
//!
//! A prebuilt vector index answers nearest-neighbor queries; the pipeline
//! turns a user query into a context-augmented one in four stages (embed,
//! retrieve + filter, rerank, augment), each with an explicit fallback so
//! RAG machinery failures never block the underlying chat flow.

pub mod builder;
pub mod chunker;
pub mod index;
pub mod pipeline;

pub use builder::IndexBuilder;
pub use chunker::chunk_paragraphs;
pub use index::{EmbeddedChunk, IndexedChunk, SharedIndex, VectorIndex};
pub use pipeline::{Augmentation, RagPipeline};
