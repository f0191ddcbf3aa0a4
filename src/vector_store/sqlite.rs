//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine distance computed in Rust for simplicity.
//! Several named collections can share one database file.

use super::{check_pairs, cosine_distance, Passage, QueryResult, VectorStore};
use crate::embedding::Embedder;
use crate::error::{OpinaError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    );
"#;

/// SQLite-based vector store bound to one collection.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl SqliteVectorStore {
    /// Open (or create) the collection `collection` in the database at `path`.
    #[instrument(skip_all, fields(collection = %collection))]
    pub fn open(path: &Path, collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened collection '{}' at {:?}", collection, path);

        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
            embedder,
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory(collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
            embedder,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| OpinaError::Storage(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    /// Load every document of the collection in insertion order.
    fn load_documents(&self) -> Result<Vec<(String, String, Vec<f32>)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, content, embedding
            FROM documents
            WHERE collection = ?1
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map(params![self.collection], |row| {
            let embedding_bytes: Vec<u8> = row.get(2)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                Self::bytes_to_embedding(&embedding_bytes),
            ))
        })?;

        let docs = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(docs)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, ids, documents), fields(count = documents.len()))]
    async fn upsert(&self, ids: &[String], documents: &[String]) -> Result<usize> {
        check_pairs(ids, documents)?;
        if documents.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(documents).await?;
        if embeddings.len() != documents.len() {
            return Err(OpinaError::MalformedResponse(format!(
                "Expected {} embeddings, received {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let indexed_at = Utc::now().to_rfc3339();

        for ((id, content), embedding) in ids.iter().zip(documents).zip(&embeddings) {
            tx.execute(
                r#"
                INSERT INTO documents (collection, id, content, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(collection, id) DO UPDATE SET
                    content = excluded.content,
                    embedding = excluded.embedding,
                    indexed_at = excluded.indexed_at
                "#,
                params![
                    self.collection,
                    id,
                    content,
                    Self::embedding_to_bytes(embedding),
                    indexed_at,
                ],
            )?;
        }

        tx.commit()?;
        debug!("Upserted {} documents into '{}'", documents.len(), self.collection);
        Ok(documents.len())
    }

    #[instrument(skip(self, text))]
    async fn query(&self, text: &str, k: usize) -> Result<QueryResult> {
        if k == 0 || self.count().await? == 0 {
            return Ok(QueryResult::empty());
        }

        let query_embedding = self.embedder.embed(text).await?;

        let passages = self
            .load_documents()?
            .into_iter()
            .map(|(id, content, embedding)| {
                let distance = cosine_distance(&query_embedding, &embedding);
                Passage::new(id, content, distance)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut passages = QueryResult::new(passages).into_passages();
        passages.truncate(k);

        debug!("Found {} matching documents", passages.len());
        Ok(QueryResult::new(passages))
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HashEmbedder;

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory("reviews", Arc::new(HashEmbedder::new())).unwrap();

        let ids = vec!["chunk_0_doc_id0".to_string(), "chunk_1_doc_id1".to_string()];
        let docs = vec![
            "battery lasts all day".to_string(),
            "camera is blurry at night".to_string(),
        ];
        assert_eq!(store.upsert(&ids, &docs).await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 2);

        let results = store.query("camera at night", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.passages()[0].id, "chunk_1_doc_id1");
        assert!(results.passages()[0].distance <= results.passages()[1].distance);
    }

    #[tokio::test]
    async fn test_empty_collection_returns_empty_result() {
        let store = SqliteVectorStore::in_memory("reviews", Arc::new(HashEmbedder::new())).unwrap();
        let results = store
            .query("No existing reviews mention battery life", 10)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let embedder = Arc::new(HashEmbedder::new());

        let phones = SqliteVectorStore::open(&path, "phones", embedder.clone()).unwrap();
        let laptops = SqliteVectorStore::open(&path, "laptops", embedder).unwrap();

        phones.upsert(&["a".into()], &["great phone".into()]).await.unwrap();
        assert_eq!(phones.count().await.unwrap(), 1);
        assert_eq!(laptops.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persists_across_reopen_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");
        let embedder = Arc::new(HashEmbedder::new());

        {
            let store = SqliteVectorStore::open(&path, "reviews", embedder.clone()).unwrap();
            store.upsert(&["a".into()], &["first version".into()]).await.unwrap();
        }

        let store = SqliteVectorStore::open(&path, "reviews", embedder).unwrap();
        store.upsert(&["a".into()], &["second version".into()]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let results = store.query("version", 1).await.unwrap();
        assert_eq!(results.passages()[0].content, "second version");
    }

    #[tokio::test]
    async fn test_embedding_failure_writes_nothing() {
        let store = SqliteVectorStore::in_memory("reviews", Arc::new(HashEmbedder::failing())).unwrap();
        let err = store.upsert(&["a".into()], &["text".into()]).await.unwrap_err();
        assert!(matches!(err, OpinaError::Provider(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let embedding = vec![0.25_f32, -1.5, 3.0];
        let bytes = SqliteVectorStore::embedding_to_bytes(&embedding);
        assert_eq!(SqliteVectorStore::bytes_to_embedding(&bytes), embedding);
    }
}
