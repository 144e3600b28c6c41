//! # OpenAI API client
//!
//! Wraps [async-openai] chat completions for the dialogue stack: one-shot replies (memory
//! extraction) and token streams (spoken replies). API keys only ever reach the logs masked.

use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    CompletionUsage, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, info};

pub use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};

/// Content deltas of one completion. Role-only and finish chunks carry no content and are skipped.
pub type TokenStream = BoxStream<'static, anyhow::Result<String>>;

const MASK: &str = "***";

/// `sk-proj***wxyz`: first 7 and last 4 characters. Keys of 11 characters or fewer are fully hidden.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_char_boundary(7) || !token.is_char_boundary(len - 4) {
        return MASK.to_string();
    }
    format!("{}{}{}", &token[..7], MASK, &token[len - 4..])
}

fn log_usage(call: &'static str, usage: &CompletionUsage) {
    info!(
        call,
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        total_tokens = usage.total_tokens,
        "OpenAI token usage"
    );
}

/// Cheap to clone; clones share one HTTP client.
#[derive(Clone)]
pub struct OpenAIClient {
    client: Arc<Client<OpenAIConfig>>,
    masked_key: String,
}

impl OpenAIClient {
    pub fn new(api_key: String) -> Self {
        Self::build(api_key, None)
    }

    /// For proxies and OpenAI-compatible servers.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self::build(api_key, Some(base_url))
    }

    fn build(api_key: String, base_url: Option<String>) -> Self {
        let masked_key = mask_token(&api_key);
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = base_url {
            config = config.with_api_base(base_url);
        }
        Self {
            client: Arc::new(Client::with_config(config)),
            masked_key,
        }
    }

    fn request(
        &self,
        call: &'static str,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> anyhow::Result<CreateChatCompletionRequest> {
        info!(
            call,
            model = %model,
            message_count = messages.len(),
            api_key = %self.masked_key,
            "OpenAI request"
        );
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .build()?;
        if let Ok(json) = serde_json::to_string(&request) {
            debug!(call, request_json = %json, "step: OpenAI request body");
        }
        Ok(request)
    }

    /// Returns the first choice's content. Errors if the response has no choices.
    pub async fn chat_completion(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> anyhow::Result<String> {
        let request = self.request("chat_completion", model, messages)?;
        let response = self.client.chat().create(request).await?;
        if let Some(usage) = &response.usage {
            log_usage("chat_completion", usage);
        }
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No response from OpenAI"))?;
        Ok(choice.message.content.unwrap_or_default())
    }

    /// Starts a streamed completion and returns its content deltas in arrival order.
    ///
    /// The request is sent before this returns, so connection and auth failures surface here;
    /// failures mid-stream arrive as `Err` items.
    pub async fn chat_completion_stream(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> anyhow::Result<TokenStream> {
        let request = self.request("chat_completion_stream", model, messages)?;
        let stream = self.client.chat().create_stream(request).await?;

        let tokens = stream.filter_map(|chunk| async move {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return Some(Err(anyhow::anyhow!("Stream error: {}", e))),
            };
            if let Some(usage) = &chunk.usage {
                log_usage("chat_completion_stream", usage);
            }
            chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .filter(|content| !content.is_empty())
                .map(Ok)
        });
        Ok(tokens.boxed())
    }
}
