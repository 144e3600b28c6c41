//! OpenAI implementation of [`LlmClient`], wrapping openai-client.

use anyhow::Result;
use async_trait::async_trait;
use prompt::ChatMessage;
use tracing::instrument;

use super::{to_openai_messages, LlmClient, TokenStream};
use crate::config::LlmConfig;

/// [`LlmClient`] backed by an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct OpenAILlmClient {
    client: openai_client::OpenAIClient,
}

impl OpenAILlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: openai_client::OpenAIClient::new(api_key),
        }
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: openai_client::OpenAIClient::with_base_url(api_key, base_url),
        }
    }

    pub fn from_config(config: &dyn LlmConfig) -> Self {
        Self::with_base_url(config.api_key().to_string(), config.base_url().to_string())
    }
}

#[async_trait]
impl LlmClient for OpenAILlmClient {
    #[instrument(skip(self, messages), fields(message_count = messages.len()))]
    async fn stream_completion(&self, messages: Vec<ChatMessage>, model: &str) -> Result<TokenStream> {
        let openai_messages = to_openai_messages(&messages)?;
        self.client
            .chat_completion_stream(model, openai_messages)
            .await
            .map_err(|e| anyhow::anyhow!("Stream error: {}", e))
    }

    #[instrument(skip(self, messages), fields(message_count = messages.len()))]
    async fn complete(&self, messages: Vec<ChatMessage>, model: &str) -> Result<String> {
        let openai_messages = to_openai_messages(&messages)?;
        self.client.chat_completion(model, openai_messages).await
    }
}
