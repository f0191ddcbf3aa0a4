//! Deterministic provider and store doubles for unit tests.

use crate::completion::{Completer, Message};
use crate::embedding::Embedder;
use crate::error::{OpinaError, Result};
use crate::vector_store::{Passage, QueryResult, VectorStore};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const DIMENSIONS: usize = 64;

/// Bag-of-words embedder: texts sharing words are close.
pub struct HashEmbedder {
    calls: AtomicUsize,
    fail: bool,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() as usize) % DIMENSIONS] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OpinaError::Provider("embedding quota exceeded".into()));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }
}

/// Completer that replays scripted replies in order and records every call.
///
/// Once the script is exhausted every call fails with a provider error.
pub struct ScriptedCompleter {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(Vec<Message>, String)>>,
}

impl ScriptedCompleter {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn from_results<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::from_results(Vec::new())
    }

    pub fn calls(&self) -> Vec<(Vec<Message>, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(&self, messages: &[Message], model: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), model.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OpinaError::Provider("upstream unavailable".into())))
    }
}

/// Store that records upsert calls and serves a fixed query result.
pub struct RecordingStore {
    upserts: Mutex<Vec<(Vec<String>, Vec<String>)>>,
    passages: Vec<Passage>,
    fail_on_upsert: Option<usize>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            upserts: Mutex::new(Vec::new()),
            passages: Vec::new(),
            fail_on_upsert: None,
        }
    }

    pub fn with_passages(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            ..Self::new()
        }
    }

    /// Fail the upsert call with this zero-based index.
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_upsert: Some(call),
            ..Self::new()
        }
    }

    pub fn upserts(&self) -> Vec<(Vec<String>, Vec<String>)> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn upsert(&self, ids: &[String], documents: &[String]) -> Result<usize> {
        let mut upserts = self.upserts.lock().unwrap();
        if self.fail_on_upsert == Some(upserts.len()) {
            return Err(OpinaError::Storage("disk full".into()));
        }
        upserts.push((ids.to_vec(), documents.to_vec()));
        Ok(documents.len())
    }

    async fn query(&self, _text: &str, k: usize) -> Result<QueryResult> {
        let mut passages = self.passages.clone();
        passages.truncate(k);
        Ok(QueryResult::new(passages))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.upserts.lock().unwrap().iter().map(|(ids, _)| ids.len()).sum())
    }

    fn collection(&self) -> &str {
        "recording"
    }
}
