//! Retrieval formatting shared by the answer and search flows.
//!
//! Turns retrieved passages into the grounding context handed to the model and
//! into the short previews returned to callers.

pub mod context;

pub use context::{format_context_for_prompt, preview, round_distance};

use crate::vector_store::Passage;
use serde::{Deserialize, Serialize};

/// Answer returned when retrieval finds nothing; no model call is made.
pub const NO_RESULTS_ANSWER: &str = "No reviews found for that question.";

/// Characters of passage content kept in a snippet.
pub const SNIPPET_CHARS: usize = 100;

/// A retrieved passage as shown to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub document_id: String,
    /// First characters of the passage, with "..." when truncated.
    pub content_snippet: String,
    /// Distance to the query rounded to 3 decimals (lower is more similar).
    pub similarity_score: f64,
}

impl From<&Passage> for Snippet {
    fn from(passage: &Passage) -> Self {
        Self {
            document_id: passage.id.clone(),
            content_snippet: preview(&passage.content, SNIPPET_CHARS),
            similarity_score: round_distance(passage.distance),
        }
    }
}

/// Result of a grounded question.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Localized answer text.
    pub answer: String,
    /// Passages the answer was grounded on, nearest first.
    pub sources: Vec<Snippet>,
}

impl Answer {
    /// The fixed answer for an empty retrieval.
    pub fn no_results() -> Self {
        Self {
            answer: NO_RESULTS_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }

    /// Whether retrieval came back empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Result of a search-only query.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub results: Vec<Snippet>,
    pub total_results: usize,
}

/// Result of an ingestion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub documents_processed: usize,
    pub batches: usize,
}
