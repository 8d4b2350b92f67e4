
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{OpenAiClient, ServiceError};
use crate::embeddings::Embedder;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiClient {
    /// Generate the embedding for a single text input
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response: EmbedResponse = self.post_json("embeddings", &request)?;
        let embedding = validate_embedding(response, self.embedding_dimension)?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

impl Embedder for OpenAiClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.generate_embedding(text)
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.embedding_dimension
    }
}

fn validate_embedding(response: EmbedResponse, expected: usize) -> Result<Vec<f32>, ServiceError> {
    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|data| data.embedding)
        .filter(|embedding| !embedding.is_empty())
        .ok_or(ServiceError::EmptyEmbedding)?;

    if embedding.len() != expected {
        return Err(ServiceError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }

    Ok(embedding)
}
