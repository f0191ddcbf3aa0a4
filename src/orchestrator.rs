//! Pipeline orchestrator for Opina.
//!
//! Composes translation, retrieval, grounded generation and conversation
//! history into the answer, search and ingestion flows.

use crate::chunking::TextChunker;
use crate::completion::{Completer, Message, OpenAICompleter};
use crate::config::{Prompts, Settings};
use crate::conversation::ConversationStore;
use crate::embedding::OpenAIEmbedder;
use crate::error::{OpinaError, Result};
use crate::openai::create_client;
use crate::rag::{format_context_for_prompt, Answer, IngestReport, SearchOutcome, Snippet};
use crate::translation::Translator;
use crate::vector_store::{QueryResult, SqliteVectorStore, VectorStore};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The main orchestrator for the Opina pipeline.
pub struct Orchestrator {
    settings: Arc<Settings>,
    prompts: Arc<Prompts>,
    completer: Arc<dyn Completer>,
    translator: Translator,
    vector_store: Arc<dyn VectorStore>,
    conversations: ConversationStore,
}

impl Orchestrator {
    /// Create an orchestrator backed by the configured provider and SQLite collection.
    ///
    /// Fails when no API key is configured. The collection is opened here, once,
    /// before any request is served.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let client = create_client(&settings)?;

        let embedder = Arc::new(OpenAIEmbedder::new(
            client.clone(),
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));
        let completer = Arc::new(OpenAICompleter::new(client, settings.completion.temperature));
        info!(
            "Using {} for embeddings and {} for completions",
            embedder.model(),
            settings.completion.model
        );

        let vector_store = Arc::new(SqliteVectorStore::open(
            &settings.store_path(),
            &settings.vector_store.collection,
            embedder,
        )?);

        Ok(Self::with_components(settings, prompts, completer, vector_store))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        completer: Arc<dyn Completer>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        let prompts = Arc::new(prompts);
        let translator = Translator::new(
            completer.clone(),
            &settings.completion.model,
            prompts.clone(),
        );
        let conversations = ConversationStore::new(
            settings.rag.max_history_messages,
            settings.rag.max_conversations,
        );

        Self {
            settings: Arc::new(settings),
            prompts,
            completer,
            translator,
            vector_store,
            conversations,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Chunker configured from the chunking settings.
    pub fn chunker(&self) -> TextChunker {
        TextChunker::new(
            self.settings.chunking.chunk_size,
            self.settings.chunking.chunk_overlap,
        )
    }

    /// Answer `question` from the review collection within `conversation_id`.
    ///
    /// History gains exactly one user/assistant pair, recorded only after the
    /// model has answered. An empty retrieval returns the fixed no-results
    /// answer without calling the model or touching history.
    #[instrument(skip(self, question), fields(conversation = %conversation_id))]
    pub async fn ask(&self, conversation_id: &str, question: &str) -> Result<Answer> {
        self.check_query(question, "question")?;

        let canonical = self.to_canonical(question).await?;
        let retrieved = self.retrieve(&canonical).await?;

        if retrieved.is_empty() {
            info!("No passages retrieved; answering with the no-results sentinel");
            return Ok(Answer::no_results());
        }

        let system = self
            .prompts
            .grounding_system(&format_context_for_prompt(retrieved.passages()));
        let user_message = Message::user(canonical);

        let raw_answer = {
            let handle = self.conversations.handle(conversation_id);
            let mut conversation = handle.lock().await;

            let mut messages = Vec::with_capacity(conversation.len() + 2);
            messages.push(Message::system(system));
            messages.extend(conversation.snapshot());
            messages.push(user_message.clone());

            let raw_answer = self
                .completer
                .complete(&messages, &self.settings.completion.model)
                .await?;

            conversation.append_turn(user_message, Message::assistant(raw_answer.clone()));
            raw_answer
        };

        let answer = self.to_user_language(&raw_answer).await?;

        Ok(Answer {
            answer,
            sources: retrieved.passages().iter().map(Snippet::from).collect(),
        })
    }

    /// Retrieve passages for `query` without generating an answer.
    #[instrument(skip(self, query))]
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        self.check_query(query, "query")?;

        let canonical = self.to_canonical(query).await?;
        let retrieved = self.retrieve(&canonical).await?;

        let results: Vec<Snippet> = retrieved.passages().iter().map(Snippet::from).collect();
        Ok(SearchOutcome {
            total_results: results.len(),
            results,
        })
    }

    /// Chunk raw review text with the configured chunker and ingest it.
    pub async fn ingest_text(&self, text: &str) -> Result<IngestReport> {
        if text.trim().is_empty() {
            return Err(OpinaError::Validation("Reviews can't be empty.".to_string()));
        }
        let chunks = self.chunker().split(text);
        self.ingest_chunks(&chunks).await
    }

    /// Store pre-chunked text in batches.
    pub async fn ingest_chunks(&self, chunks: &[String]) -> Result<IngestReport> {
        self.ingest_chunks_with_progress(chunks, |_| {}).await
    }

    /// Store pre-chunked text in batches, calling `on_batch` with the running
    /// document count after each committed batch.
    ///
    /// Ids are `chunk_<n>_doc_id<n>` with `n` the chunk's offset in `chunks`.
    /// Batches commit independently: when one fails, earlier batches stay stored.
    #[instrument(skip(self, chunks, on_batch), fields(chunks = chunks.len()))]
    pub async fn ingest_chunks_with_progress<F>(
        &self,
        chunks: &[String],
        mut on_batch: F,
    ) -> Result<IngestReport>
    where
        F: FnMut(usize) + Send,
    {
        let batch_size = self.settings.vector_store.batch_size.max(1);
        let total_batches = chunks.len().div_ceil(batch_size);
        let mut stored = 0;

        for (batch_index, batch) in chunks.chunks(batch_size).enumerate() {
            let offset = batch_index * batch_size;
            let ids: Vec<String> = (offset..offset + batch.len()).map(chunk_id).collect();

            if let Err(e) = self.vector_store.upsert(&ids, batch).await {
                warn!(
                    "Ingestion stopped at batch {} of {}; {} documents already stored: {}",
                    batch_index + 1,
                    total_batches,
                    stored,
                    e
                );
                return Err(e);
            }

            stored += batch.len();
            info!("Stored batch {} of {}", batch_index + 1, total_batches);
            on_batch(stored);
        }

        Ok(IngestReport {
            documents_processed: stored,
            batches: total_batches,
        })
    }

    /// History of `conversation_id`.
    pub async fn history(&self, conversation_id: &str) -> Vec<Message> {
        self.conversations.snapshot(conversation_id).await
    }

    /// Clear the history of `conversation_id` and forget the id. Always succeeds.
    pub async fn clear_history(&self, conversation_id: &str) {
        self.conversations.clear(conversation_id).await;
        debug!(
            "Cleared history for {}; {} conversations held",
            conversation_id,
            self.conversations.len()
        );
    }

    fn check_query(&self, text: &str, what: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(OpinaError::Validation(format!("The {} can't be empty.", what)));
        }

        let max = self.settings.rag.max_question_chars;
        if text.chars().count() > max {
            return Err(OpinaError::Validation(format!(
                "The {} exceeds {} characters.",
                what, max
            )));
        }
        Ok(())
    }

    async fn retrieve(&self, canonical_query: &str) -> Result<QueryResult> {
        let k = self.settings.rag.similarity_results;
        let result = self.vector_store.query(canonical_query, k).await?;
        debug!("Retrieved {} passages", result.len());
        Ok(result)
    }

    async fn to_canonical(&self, text: &str) -> Result<String> {
        let language = &self.settings.rag.canonical_language;
        self.translate_or_fallback(text, language).await
    }

    async fn to_user_language(&self, text: &str) -> Result<String> {
        let language = &self.settings.rag.response_language;
        self.translate_or_fallback(text, language).await
    }

    async fn translate_or_fallback(&self, text: &str, language: &str) -> Result<String> {
        match self.translator.translate(text, language).await {
            Ok(translated) => Ok(translated),
            Err(e) if !self.settings.rag.strict_translation => {
                warn!("Translation to {} failed, using original text: {}", language, e);
                Ok(text.to_string())
            }
            Err(e) => Err(e),
        }
    }
}

/// Id of the chunk at `offset` within one ingestion call.
pub fn chunk_id(offset: usize) -> String {
    format!("chunk_{}_doc_id{}", offset, offset)
}
