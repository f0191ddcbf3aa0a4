//! Opina - question answering over product reviews
//!
//! Ask questions in your own language and get answers grounded only in the
//! reviews you have uploaded.
//!
//! # Overview
//!
//! Opina allows you to:
//! - Upload raw review dumps, chunked and embedded into a local vector store
//! - Ask questions and get answers that cite the passages they came from
//! - Search reviews semantically without generating an answer
//! - Keep a running conversation per caller-chosen conversation id
//!
//! Questions are translated into a canonical working language before
//! retrieval, and answers are translated back into the response language.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `embedding` - Embedding gateway
//! - `completion` - Chat completion gateway
//! - `translation` - Translation between user and canonical language
//! - `vector_store` - Vector store abstraction (SQLite, in-memory)
//! - `conversation` - Per-conversation chat history
//! - `chunking` - Review text chunking
//! - `rag` - Context and snippet formatting
//! - `orchestrator` - Pipeline coordination
//! - `cli` - Command line and HTTP surfaces
//!
//! # Example
//!
//! ```rust,no_run
//! use opina::config::Settings;
//! use opina::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let answer = orchestrator.ask("default", "¿Cuánto dura la batería?").await?;
//!     println!("{}", answer.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod translation;
pub mod vector_store;

#[cfg(test)]
mod testing;

pub use error::{OpinaError, Result};
