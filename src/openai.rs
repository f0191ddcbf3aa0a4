//! OpenAI-compatible client configuration.

use crate::config::Settings;
use crate::error::{OpinaError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Provider client shared by the embedding and completion gateways.
pub type ProviderClient = Client<OpenAIConfig>;

/// Create a client from settings.
///
/// Fails when no API key is configured or the HTTP client cannot be built.
pub fn create_client(settings: &Settings) -> Result<ProviderClient> {
    let mut config = OpenAIConfig::new().with_api_key(settings.api_key()?);
    if let Some(base) = &settings.provider.api_base {
        config = config.with_api_base(base.trim_end_matches('/'));
    }

    create_client_with_timeout(config, Duration::from_secs(settings.provider.timeout_seconds))
}

/// Create a client with an explicit config and timeout.
pub fn create_client_with_timeout(config: OpenAIConfig, timeout: Duration) -> Result<ProviderClient> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| OpinaError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(config).with_http_client(http_client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_api_key() {
        let settings = Settings::default();
        assert!(matches!(create_client(&settings), Err(OpinaError::Config(_))));
    }

    #[test]
    fn test_client_with_custom_base() {
        let mut settings = Settings::default();
        settings.provider.api_key = Some("sk-test".into());
        settings.provider.api_base = Some("http://localhost:11434/v1/".into());
        assert!(create_client(&settings).is_ok());
    }
}
