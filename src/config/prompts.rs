//! Prompt templates for Opina.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub grounding: GroundingPrompts,
    pub translation: TranslationPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for grounded answers over retrieved reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingPrompts {
    /// System prompt; `{{context}}` receives the retrieved passages.
    pub system: String,
    /// Phrase the model must use when the reviews cannot answer the question.
    pub refusal: String,
}

impl Default for GroundingPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a specialized system in answering questions about product reviews.
You must answer the user's question about a product using the reviews given:

Reviews:
{{context}}

You must obey the following rules:
- You must not answer with information that is not in the context.
- If you cannot answer the question, or the question is not related to the reviews, you must answer with "{{refusal}}"
- Do not use emojis or emoticons in your answer.
- If the question has already been made, you must answer with the previous answer."#
                .to_string(),
            refusal: "I can't answer that.".to_string(),
        }
    }
}

/// Prompts for the translation boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationPrompts {
    /// System prompt; `{{language}}` receives the target language.
    pub system: String,
    /// User message; `{{text}}` and `{{language}}` are substituted.
    pub user: String,
}

impl Default for TranslationPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert translator who can translate texts from any language to another.
You always maintain the exact meaning and coherence of the original text.
Your task is to translate a text to {{language}}."#
                .to_string(),
            user: r#"You must translate the following text to {{language}}:

{{text}}

Your answer must be only the translated text, with no commentary."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let grounding_path = custom_path.join("grounding.toml");
            if grounding_path.exists() {
                let content = std::fs::read_to_string(&grounding_path)?;
                prompts.grounding = toml::from_str(&content)?;
            }

            let translation_path = custom_path.join("translation.toml");
            if translation_path.exists() {
                let content = std::fs::read_to_string(&translation_path)?;
                prompts.translation = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Build the grounding system prompt around already formatted passages.
    pub fn grounding_system(&self, context: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("refusal".to_string(), self.grounding.refusal.clone());
        self.render_around(&self.grounding.system, "{{context}}", context, &vars)
    }

    /// Build the (system, user) pair for translating `text` into `language`.
    pub fn translation_messages(&self, text: &str, language: &str) -> (String, String) {
        let mut vars = HashMap::new();
        vars.insert("language".to_string(), language.to_string());
        let system = self.render_with_custom(&self.translation.system, &vars);
        let user = self.render_around(&self.translation.user, "{{text}}", text, &vars);
        (system, user)
    }

    /// Render the pieces of `template` between occurrences of `placeholder`,
    /// then join them with `value` verbatim. `value` is never template-expanded.
    fn render_around(
        &self,
        template: &str,
        placeholder: &str,
        value: &str,
        vars: &HashMap<String, String>,
    ) -> String {
        template
            .split(placeholder)
            .map(|piece| self.render_with_custom(piece, vars))
            .collect::<Vec<_>>()
            .join(value)
    }
}
