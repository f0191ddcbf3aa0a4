//! Configuration settings for Opina.

use crate::error::{OpinaError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub provider: ProviderSettings,
    pub embedding: EmbeddingSettings,
    pub completion: CompletionSettings,
    pub vector_store: VectorStoreSettings,
    pub chunking: ChunkingSettings,
    pub rag: RagSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.opina".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Credentials and transport for the OpenAI-compatible provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API key. Usually supplied through `OPINA_API_KEY` or `OPENAI_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible endpoint. Defaults to api.openai.com.
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            timeout_seconds: 300,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Chat completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Model used for grounded answers and translation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Path to the SQLite file holding the collection.
    pub path: String,
    /// Collection name inside the file.
    pub collection: String,
    /// Documents per upsert batch during ingestion.
    pub batch_size: usize,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            path: "~/.opina/reviews.db".to_string(),
            collection: "reviewsdb".to_string(),
            batch_size: 96,
        }
    }
}

/// Text chunking settings for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 0,
        }
    }
}

/// Retrieval and answering policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Number of passages retrieved per query.
    pub similarity_results: usize,
    /// Working language for retrieval and generation.
    pub canonical_language: String,
    /// Language answers are localized to.
    pub response_language: String,
    /// Maximum accepted length of a question or search query, in characters.
    pub max_question_chars: usize,
    /// Cap on stored history messages per conversation (0 = unbounded, otherwise even).
    pub max_history_messages: usize,
    /// Conversations kept in memory before idle ones are evicted (0 = unbounded).
    pub max_conversations: usize,
    /// Fail the request when translation fails instead of using the untranslated text.
    pub strict_translation: bool,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            similarity_results: 10,
            canonical_language: "English".to_string(),
            response_language: "Spanish".to_string(),
            max_question_chars: 500,
            max_history_messages: 0,
            max_conversations: 1000,
            strict_translation: false,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin, or "*" for any.
    pub cors_origins: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: "*".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides are applied on top of the file and the result is validated.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Overlay values from environment variables, looked up through `var`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPINA_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.provider.api_key = Some(key);
        }
        if let Some(base) = get("OPINA_API_BASE") {
            self.provider.api_base = Some(base);
        }
        if let Some(path) = get("OPINA_DB_PATH") {
            self.vector_store.path = path;
        }
        if let Some(name) = get("OPINA_COLLECTION") {
            self.vector_store.collection = name;
        }
        if let Some(v) = get("OPINA_CHUNK_SIZE") {
            self.chunking.chunk_size = parse_env("OPINA_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("OPINA_CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_env("OPINA_CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = get("OPINA_SIMILARITY_RESULTS") {
            self.rag.similarity_results = parse_env("OPINA_SIMILARITY_RESULTS", &v)?;
        }
        if let Some(model) = get("OPINA_LLM_MODEL") {
            self.completion.model = model;
        }
        if let Some(model) = get("OPINA_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(origins) = get("OPINA_CORS_ORIGINS") {
            self.server.cors_origins = origins;
        }
        if let Some(level) = get("OPINA_LOG_LEVEL") {
            self.general.log_level = level.to_lowercase();
        }
        if let Some(host) = get("OPINA_HOST") {
            self.server.host = host;
        }
        if let Some(v) = get("OPINA_PORT") {
            self.server.port = parse_env("OPINA_PORT", &v)?;
        }

        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.vector_store.batch_size == 0 {
            return Err(OpinaError::Config("vector_store.batch_size must be at least 1".into()));
        }
        if self.rag.similarity_results == 0 {
            return Err(OpinaError::Config("rag.similarity_results must be at least 1".into()));
        }
        if self.chunking.chunk_size == 0 {
            return Err(OpinaError::Config("chunking.chunk_size must be at least 1".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(OpinaError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.rag.max_history_messages % 2 != 0 {
            return Err(OpinaError::Config(format!(
                "rag.max_history_messages ({}) must be 0 or an even number so whole turns are kept",
                self.rag.max_history_messages
            )));
        }
        if let Some(base) = &self.provider.api_base {
            url::Url::parse(base).map_err(|e| {
                OpinaError::Config(format!("provider.api_base '{}' is not a valid URL: {}", base, e))
            })?;
        }
        Ok(())
    }

    /// The provider API key; required before any provider call can be made.
    pub fn api_key(&self) -> Result<&str> {
        self.provider
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                OpinaError::Config(
                    "No API key configured. Set it with: export OPINA_API_KEY='sk-...'".to_string(),
                )
            })
    }

    /// Save settings to a specific path. The API key is never written.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut redacted = self.clone();
        redacted.provider.api_key = None;
        let content = toml::to_string_pretty(&redacted)
            .map_err(|e| OpinaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("opina")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded vector store path.
    pub fn store_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.path)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| OpinaError::Config(format!("{} has invalid value '{}': {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.vector_store.batch_size, 96);
        assert_eq!(settings.vector_store.collection, "reviewsdb");
        assert_eq!(settings.rag.similarity_results, 10);
        assert_eq!(settings.chunking.chunk_size, 2000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("OPINA_SIMILARITY_RESULTS", "4"),
                ("OPINA_COLLECTION", "phones"),
                ("OPINA_LOG_LEVEL", "DEBUG"),
            ]))
            .unwrap();

        assert_eq!(settings.api_key().unwrap(), "sk-test");
        assert_eq!(settings.rag.similarity_results, 4);
        assert_eq!(settings.vector_store.collection, "phones");
        assert_eq!(settings.general.log_level, "debug");
    }

    #[test]
    fn test_opina_key_wins_over_openai_key() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[("OPENAI_API_KEY", "sk-a"), ("OPINA_API_KEY", "sk-b")]))
            .unwrap();
        assert_eq!(settings.api_key().unwrap(), "sk-b");
    }

    #[test]
    fn test_bad_numeric_override() {
        let mut settings = Settings::default();
        let err = settings.apply_env(env(&[("OPINA_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, OpinaError::Config(_)));
    }

    #[test]
    fn test_missing_api_key() {
        let settings = Settings::default();
        assert!(matches!(settings.api_key(), Err(OpinaError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let mut settings = Settings::default();
        settings.chunking.chunk_overlap = settings.chunking.chunk_size;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.provider.api_base = Some("not a url".into());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_history_limit_must_hold_whole_turns() {
        let mut settings = Settings::default();
        for limit in [1, 3] {
            settings.rag.max_history_messages = limit;
            assert!(matches!(settings.validate(), Err(OpinaError::Config(_))));
        }
        for limit in [0, 2, 20] {
            settings.rag.max_history_messages = limit;
            assert!(settings.validate().is_ok());
        }
    }

    #[test]
    fn test_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
            [rag]
            response_language = "French"
            "#,
        )
        .unwrap();
        assert_eq!(settings.rag.response_language, "French");
        assert_eq!(settings.rag.similarity_results, 10);
    }

    #[test]
    fn test_save_never_writes_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut settings = Settings::default();
        settings.provider.api_key = Some("sk-secret".into());
        settings.save_to(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("sk-secret"));
    }
}
