//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{check_pairs, cosine_distance, Passage, QueryResult, VectorStore};
use crate::embedding::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

struct StoredDocument {
    id: String,
    content: String,
    embedding: Vec<f32>,
}

/// In-memory vector store. Documents keep their insertion order.
pub struct MemoryVectorStore {
    collection: String,
    embedder: Arc<dyn Embedder>,
    documents: RwLock<Vec<StoredDocument>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new(collection: &str, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            collection: collection.to_string(),
            embedder,
            documents: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, ids: &[String], documents: &[String]) -> Result<usize> {
        check_pairs(ids, documents)?;
        if documents.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(documents).await?;

        let mut store = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        for ((id, content), embedding) in ids.iter().zip(documents).zip(embeddings) {
            match store.iter_mut().find(|d| &d.id == id) {
                Some(existing) => {
                    existing.content = content.clone();
                    existing.embedding = embedding;
                }
                None => store.push(StoredDocument {
                    id: id.clone(),
                    content: content.clone(),
                    embedding,
                }),
            }
        }

        Ok(documents.len())
    }

    async fn query(&self, text: &str, k: usize) -> Result<QueryResult> {
        if k == 0 || self.count().await? == 0 {
            return Ok(QueryResult::empty());
        }

        let query_embedding = self.embedder.embed(text).await?;

        let docs = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        let passages = docs
            .iter()
            .map(|doc| {
                Passage::new(
                    doc.id.clone(),
                    doc.content.clone(),
                    cosine_distance(&query_embedding, &doc.embedding),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let mut passages = QueryResult::new(passages).into_passages();
        passages.truncate(k);
        Ok(QueryResult::new(passages))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.documents.read().unwrap_or_else(PoisonError::into_inner).len())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
