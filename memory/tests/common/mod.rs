//! Shared fakes for memory service tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use embedding::EmbeddingService;
use llm_client::{LlmClient, TokenStream};
use memory_core::{ExtractedMemory, MemoryExtractionContext, MemoryExtractor};
use prompt::ChatMessage;

/// Returns the same unit vector for every text; counts calls.
#[derive(Default)]
pub struct MockEmbeddingService {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingService for MockEmbeddingService {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1.0, 0.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }
}

/// Always fails.
pub struct FailingEmbeddingService;

#[async_trait]
impl EmbeddingService for FailingEmbeddingService {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, anyhow::Error> {
        anyhow::bail!("embedding service unavailable")
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        anyhow::bail!("embedding service unavailable")
    }
}

/// Extractor returning fixed candidates and recording each context it receives.
#[derive(Default)]
pub struct MockExtractor {
    pub candidates: Vec<ExtractedMemory>,
    pub contexts: Mutex<Vec<MemoryExtractionContext>>,
}

impl MockExtractor {
    pub fn returning(candidates: Vec<ExtractedMemory>) -> Arc<Self> {
        Arc::new(Self {
            candidates,
            contexts: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }
}

#[async_trait]
impl MemoryExtractor for MockExtractor {
    async fn extract_memories(
        &self,
        context: &MemoryExtractionContext,
    ) -> Result<Vec<ExtractedMemory>, anyhow::Error> {
        self.contexts.lock().unwrap().push(context.clone());
        Ok(self.candidates.clone())
    }
}

/// LLM that answers `complete` with a canned reply and records the messages.
pub struct MockLlmClient {
    pub reply: String,
    pub requests: Mutex<Vec<(Vec<ChatMessage>, String)>>,
}

impl MockLlmClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn stream_completion(
        &self,
        _messages: Vec<ChatMessage>,
        _model: &str,
    ) -> anyhow::Result<TokenStream> {
        anyhow::bail!("streaming not used by the extractor")
    }

    async fn complete(&self, messages: Vec<ChatMessage>, model: &str) -> anyhow::Result<String> {
        self.requests
            .lock()
            .unwrap()
            .push((messages, model.to_string()));
        Ok(self.reply.clone())
    }
}
