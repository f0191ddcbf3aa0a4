//! Configuration module for Opina.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{GroundingPrompts, Prompts, TranslationPrompts};
pub use settings::{
    ChunkingSettings, CompletionSettings, EmbeddingSettings, GeneralSettings, PromptSettings,
    ProviderSettings, RagSettings, ServerSettings, Settings, VectorStoreSettings,
};
