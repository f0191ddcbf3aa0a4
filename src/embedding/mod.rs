//! Embedding generation for semantic search and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::{OpinaError, Result};
use async_trait::async_trait;

/// Trait for embedding generation.
///
/// Implementations never cache or retry; every call reaches the provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for multiple texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OpinaError::MalformedResponse("Empty embedding response".to_string()))
    }

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
