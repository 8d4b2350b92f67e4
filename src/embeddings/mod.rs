// Embeddings module
// Fixed-size text chunking and the embedding service client

pub mod chunking;
pub mod openai;

pub use chunking::{ChunkingConfig, ContentChunk, chunk_text, join_chunks};
pub use openai::DEFAULT_EMBEDDING_DIMENSION;

use crate::client::ServiceError;

/// Maps text to a fixed-length embedding vector.
///
/// Each call is one round trip to the embedding service. Implementations do
/// not retry; a failed call is returned to the caller as-is.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;
}
