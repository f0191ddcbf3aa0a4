//! Error types for Opina.

use thiserror::Error;

/// Library-level error type for Opina operations.
#[derive(Error, Debug)]
pub enum OpinaError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream embedding or completion call failed (network, auth, quota).
    #[error("Provider error: {0}")]
    Provider(String),

    /// Upstream call succeeded but the payload was unusable.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No results: {0}")]
    NoResults(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Coarse failure category used at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Provider,
    Storage,
    Translation,
    Validation,
    NoResults,
    Internal,
}

impl OpinaError {
    /// Classify this error for boundary mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OpinaError::Config(_) | OpinaError::TomlParse(_) => ErrorKind::Config,
            OpinaError::Provider(_) | OpinaError::MalformedResponse(_) => ErrorKind::Provider,
            OpinaError::Storage(_) | OpinaError::Database(_) => ErrorKind::Storage,
            OpinaError::Translation(_) => ErrorKind::Translation,
            OpinaError::Validation(_) => ErrorKind::Validation,
            OpinaError::NoResults(_) => ErrorKind::NoResults,
            OpinaError::Io(_) | OpinaError::Json(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for Opina operations.
pub type Result<T> = std::result::Result<T, OpinaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(OpinaError::Provider("quota".into()).kind(), ErrorKind::Provider);
        assert_eq!(
            OpinaError::MalformedResponse("no content".into()).kind(),
            ErrorKind::Provider
        );
        assert_eq!(
            OpinaError::Database(rusqlite::Error::QueryReturnedNoRows).kind(),
            ErrorKind::Storage
        );
        assert_eq!(OpinaError::Validation("empty".into()).kind(), ErrorKind::Validation);
    }
}
