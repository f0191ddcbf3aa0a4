//! Vector store abstraction for Opina.
//!
//! A store owns one named collection and the embedding function used for it:
//! callers hand over raw text, and the store embeds documents on insert and
//! queries on search.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::{OpinaError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A retrieved chunk with its distance to the query (lower is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub content: String,
    pub distance: f32,
}

impl Passage {
    /// Create a passage, rejecting negative or non-finite distances.
    pub fn new(id: impl Into<String>, content: impl Into<String>, distance: f32) -> Result<Self> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(OpinaError::Storage(format!("Invalid distance {}", distance)));
        }
        Ok(Self {
            id: id.into(),
            content: content.into(),
            distance,
        })
    }
}

/// Passages ordered nearest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    passages: Vec<Passage>,
}

impl QueryResult {
    /// Build a result, ordering passages by ascending distance (stable for ties).
    pub fn new(mut passages: Vec<Passage>) -> Self {
        passages.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Self { passages }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn into_passages(self) -> Vec<Passage> {
        self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite documents paired 1:1 with `ids`, embedding each one.
    ///
    /// A single call is committed atomically; separate calls are independent.
    async fn upsert(&self, ids: &[String], documents: &[String]) -> Result<usize>;

    /// Return up to `k` passages nearest to `text`, nearest first.
    ///
    /// An empty collection yields an empty result, not an error.
    async fn query(&self, text: &str, k: usize) -> Result<QueryResult>;

    /// Number of documents in the collection.
    async fn count(&self) -> Result<usize>;

    /// Name of the collection this store owns.
    fn collection(&self) -> &str;
}

/// Check that ids and documents line up before embedding anything.
pub(crate) fn check_pairs(ids: &[String], documents: &[String]) -> Result<()> {
    if ids.len() != documents.len() {
        return Err(OpinaError::Validation(format!(
            "{} ids supplied for {} documents",
            ids.len(),
            documents.len()
        )));
    }
    Ok(())
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0)
}
