//! OpenAI embeddings implementation.

use super::Embedder;
use crate::error::{OpinaError, Result};
use crate::openai::ProviderClient;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Inputs per provider request.
const REQUEST_LIMIT: usize = 96;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: ProviderClient,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create a new embedder on an existing provider client.
    pub fn new(client: ProviderClient, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
        }
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(REQUEST_LIMIT) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| OpinaError::Provider(format!("Failed to build embedding request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| OpinaError::Provider(format!("Embedding API error: {}", e)))?;

            if response.data.len() != chunk.len() {
                return Err(OpinaError::MalformedResponse(format!(
                    "Expected {} embeddings, received {}",
                    chunk.len(),
                    response.data.len()
                )));
            }

            // Sort by index to ensure correct order
            let mut embeddings = response.data;
            embeddings.sort_by_key(|e| e.index);
            all_embeddings.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::config::OpenAIConfig;
    use std::time::Duration;

    fn client() -> ProviderClient {
        crate::openai::create_client_with_timeout(
            OpenAIConfig::new().with_api_key("sk-test"),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_embedder_creation() {
        let embedder = OpenAIEmbedder::new(client(), "text-embedding-3-small", 1536);
        assert_eq!(embedder.dimensions(), 1536);
        assert_eq!(embedder.model(), "text-embedding-3-small");
    }

    #[tokio::test]
    async fn test_empty_batch_skips_provider() {
        let embedder = OpenAIEmbedder::new(client(), "text-embedding-3-small", 8);
        let out = embedder.embed_batch(&[]).await.unwrap();
        assert!(out.is_empty());
    }
}
