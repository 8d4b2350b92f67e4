
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// A fixed-size window of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChunk {
    /// Position of this chunk in the document, also its id in the vector index
    pub chunk_index: usize,
    /// The chunk text
    pub content: String,
}

/// Configuration for text chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Split document text into consecutive, non-overlapping windows of
/// `config.chunk_size` characters. The last chunk may be shorter.
///
/// Concatenating the returned chunks in order reproduces `text` exactly.
/// A chunk size of zero is treated as one.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<ContentChunk> {
    let chunk_size = config.chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();

    let chunks: Vec<ContentChunk> = chars
        .chunks(chunk_size)
        .enumerate()
        .map(|(chunk_index, window)| ContentChunk {
            chunk_index,
            content: window.iter().collect(),
        })
        .collect();

    debug!(
        "Chunked {} characters into {} chunks of up to {} characters",
        chars.len(),
        chunks.len(),
        chunk_size
    );

    chunks
}

/// Reassemble chunks in order
#[inline]
pub fn join_chunks(chunks: &[ContentChunk]) -> String {
    chunks.iter().map(|c| c.content.as_str()).collect()
}
