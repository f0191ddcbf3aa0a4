//! OpenAI chat completion implementation.

use super::{Completer, Message, Role};
use crate::error::{OpinaError, Result};
use crate::openai::ProviderClient;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI-based completer.
pub struct OpenAICompleter {
    client: ProviderClient,
    temperature: f32,
}

impl OpenAICompleter {
    pub fn new(client: ProviderClient, temperature: f32) -> Self {
        Self {
            client,
            temperature,
        }
    }
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let build_err = |e: async_openai::error::OpenAIError| {
        OpinaError::Provider(format!("Failed to build message: {}", e))
    };

    let converted = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(build_err)?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(build_err)?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(build_err)?
            .into(),
    };

    Ok(converted)
}

#[async_trait]
impl Completer for OpenAICompleter {
    #[instrument(skip(self, messages), fields(messages = messages.len()))]
    async fn complete(&self, messages: &[Message], model: &str) -> Result<String> {
        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(request_messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| OpinaError::Provider(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| OpinaError::Provider(format!("Chat API error: {}", e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| OpinaError::MalformedResponse("No content in model reply".to_string()))?;

        debug!("Completion returned {} chars", content.len());
        Ok(content)
    }
}
