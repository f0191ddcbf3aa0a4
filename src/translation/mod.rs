//! Translation between the user's language and the canonical working language.
//!
//! Translation is a single-shot completion with a fixed translator prompt. The
//! output language is not verified; the model is trusted to comply.

use crate::completion::{Completer, Message};
use crate::config::Prompts;
use crate::error::{OpinaError, Result};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Translates text through a chat completion model.
pub struct Translator {
    completer: Arc<dyn Completer>,
    model: String,
    prompts: Arc<Prompts>,
}

impl Translator {
    pub fn new(completer: Arc<dyn Completer>, model: &str, prompts: Arc<Prompts>) -> Self {
        Self {
            completer,
            model: model.to_string(),
            prompts,
        }
    }

    /// Translate `text` into `target_language`.
    ///
    /// Blank input is returned unchanged without a provider call. Any provider
    /// failure is reported as a translation error.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let (system, user) = self.prompts.translation_messages(text, target_language);
        let messages = [Message::system(system), Message::user(user)];

        let translated = self
            .completer
            .complete(&messages, &self.model)
            .await
            .map_err(|e| OpinaError::Translation(e.to_string()))?;

        let translated = translated.trim();
        if translated.is_empty() {
            return Err(OpinaError::Translation("Model returned an empty translation".into()));
        }

        debug!("Translated {} chars into {}", text.len(), target_language);
        Ok(translated.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCompleter;

    fn translator(completer: Arc<ScriptedCompleter>) -> Translator {
        Translator::new(completer, "test-model", Arc::new(Prompts::default()))
    }

    #[tokio::test]
    async fn test_translate_uses_single_shot_prompt() {
        let completer = Arc::new(ScriptedCompleter::new(["  How is the battery?\n"]));
        let out = translator(completer.clone())
            .translate("¿Qué tal la batería?", "English")
            .await
            .unwrap();

        assert_eq!(out, "How is the battery?");

        let calls = completer.calls();
        assert_eq!(calls.len(), 1);
        let (messages, model) = &calls[0];
        assert_eq!(model, "test-model");
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("English"));
        assert!(messages[1].content.contains("¿Qué tal la batería?"));
    }

    #[tokio::test]
    async fn test_blank_input_skips_provider() {
        let completer = Arc::new(ScriptedCompleter::new(Vec::<String>::new()));
        let out = translator(completer.clone()).translate("   ", "Spanish").await.unwrap();
        assert_eq!(out, "   ");
        assert!(completer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_translation_error() {
        let completer = Arc::new(ScriptedCompleter::failing());
        let err = translator(completer).translate("hola", "English").await.unwrap_err();
        assert!(matches!(err, OpinaError::Translation(_)));
    }
}
