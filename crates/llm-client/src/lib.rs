//! # LLM client abstraction
//!
//! Defines the [`LlmClient`] port and an OpenAI implementation. Transport-agnostic;
//! used by the dialogue pipeline (streamed replies) and the memory extractor (one-shot replies).

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use openai_client::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use prompt::{ChatMessage, MessageRole};

mod config;
mod openai_llm;

pub use config::{EnvLlmConfig, LlmConfig};
pub use openai_llm::OpenAILlmClient;

/// Tokens of one completion, in order. Finite; an `Err` item ends the completion.
pub type TokenStream = BoxStream<'static, Result<String>>;

/// LLM port: streamed or one-shot completion for a list of messages.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Starts a completion and returns its tokens as they arrive.
    async fn stream_completion(&self, messages: Vec<ChatMessage>, model: &str) -> Result<TokenStream>;

    /// Returns the whole reply text.
    async fn complete(&self, messages: Vec<ChatMessage>, model: &str) -> Result<String>;
}

/// Converts a single [`ChatMessage`] into OpenAI API message format.
fn chat_message_to_openai(msg: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let content = msg.content.clone();
    let openai_msg: ChatCompletionRequestMessage = match msg.role {
        MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(openai_msg)
}

fn to_openai_messages(messages: &[ChatMessage]) -> Result<Vec<ChatCompletionRequestMessage>> {
    messages.iter().map(chat_message_to_openai).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_every_role() {
        let messages = vec![
            ChatMessage::system("s"),
            ChatMessage::user("u"),
            ChatMessage::assistant("a"),
        ];
        let converted = to_openai_messages(&messages).unwrap();
        assert!(matches!(converted[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(converted[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(converted[2], ChatCompletionRequestMessage::Assistant(_)));
    }
}
