//! Shared fakes for dialogue pipeline tests: scripted LLM, per-sentence TTS, collecting reporter.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dialogue::{
    DialoguePipelineMonitor, DialoguePipelineService, PipelineDependencies, PipelineOptions,
    PipelineReporter, PipelineSummary,
};
use dialogue_core::{Clock, SystemClock};
use embedding::EmbeddingService;
use futures::stream::{self, StreamExt};
use llm_client::{LlmClient, TokenStream};
use memory::{
    ExtractedMemory, MemoryConfig, MemoryExtractionContext, MemoryExtractionService,
    MemoryExtractor, MemoryRetrievalService,
};
use memory_inmemory::InMemoryVectorStore;
use prompt::ChatMessage;
use storage::{InMemoryConversationCounter, InMemoryConversationRepository};
use tts::{AudioStream, TtsClient, TtsError};

/// LLM streaming a fixed token script. Optionally fails to open, or fails after the script.
#[derive(Default)]
pub struct ScriptedLlm {
    pub tokens: Vec<String>,
    pub open_error: Option<String>,
    pub trailing_error: Option<String>,
    pub requests: Mutex<Vec<(Vec<ChatMessage>, String)>>,
}

impl ScriptedLlm {
    pub fn tokens(tokens: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        })
    }

    pub fn failing_to_open(message: &str) -> Arc<Self> {
        Arc::new(Self {
            open_error: Some(message.to_string()),
            ..Self::default()
        })
    }

    pub fn failing_after(tokens: &[&str], message: &str) -> Arc<Self> {
        Arc::new(Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            trailing_error: Some(message.to_string()),
            ..Self::default()
        })
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|(messages, _)| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn stream_completion(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
    ) -> anyhow::Result<TokenStream> {
        self.requests
            .lock()
            .unwrap()
            .push((messages, model.to_string()));
        if let Some(message) = &self.open_error {
            anyhow::bail!("{}", message);
        }
        let mut items: Vec<anyhow::Result<String>> =
            self.tokens.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.trailing_error {
            items.push(Err(anyhow::anyhow!("{}", message)));
        }
        Ok(stream::iter(items).boxed())
    }

    async fn complete(&self, _messages: Vec<ChatMessage>, _model: &str) -> anyhow::Result<String> {
        Ok("[]".to_string())
    }
}

/// TTS returning `"<sentence>|<n>"` chunks after a per-sentence delay.
#[derive(Default)]
pub struct MockTts {
    pub chunks_per_sentence: usize,
    pub delays: HashMap<String, Duration>,
    pub fail_on: Option<String>,
    pub prepare_fails: bool,
    pub prepare_calls: AtomicUsize,
    pub synthesized: Mutex<Vec<String>>,
}

impl MockTts {
    pub fn new(chunks_per_sentence: usize) -> Self {
        Self {
            chunks_per_sentence,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, sentence: &str, delay: Duration) -> Self {
        self.delays.insert(sentence.to_string(), delay);
        self
    }

    pub fn failing_on(mut self, sentence: &str) -> Self {
        self.fail_on = Some(sentence.to_string());
        self
    }

    pub fn with_failing_prepare(mut self) -> Self {
        self.prepare_fails = true;
        self
    }

    pub fn chunk(sentence: &str, index: usize) -> Bytes {
        Bytes::from(format!("{}|{}", sentence, index))
    }

    pub fn synthesized(&self) -> Vec<String> {
        self.synthesized.lock().unwrap().clone()
    }
}

#[async_trait]
impl TtsClient for MockTts {
    fn stream_synthesize(&self, text: &str) -> AudioStream {
        self.synthesized.lock().unwrap().push(text.to_string());
        let delay = self.delays.get(text).copied().unwrap_or_default();
        let items: Vec<Result<Bytes, TtsError>> = if self.fail_on.as_deref() == Some(text) {
            vec![Err(TtsError::Http {
                status: 503,
                body: "overloaded".to_string(),
            })]
        } else {
            (0..self.chunks_per_sentence)
                .map(|i| Ok(Self::chunk(text, i)))
                .collect()
        };
        stream::once(async move {
            tokio::time::sleep(delay).await;
            stream::iter(items)
        })
        .flatten()
        .boxed()
    }

    async fn prepare(&self) -> Result<(), TtsError> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if self.prepare_fails {
            return Err(TtsError::Connection("warm-up refused".to_string()));
        }
        Ok(())
    }
}

/// Same vector for every text.
pub struct FixedEmbedding;

#[async_trait]
impl EmbeddingService for FixedEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, anyhow::Error> {
        Ok(vec![1.0, 0.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }
}

pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingService for FailingEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, anyhow::Error> {
        anyhow::bail!("embedding service unavailable")
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        anyhow::bail!("embedding service unavailable")
    }
}

/// Extractor returning fixed candidates; counts calls.
#[derive(Default)]
pub struct CountingExtractor {
    pub candidates: Vec<ExtractedMemory>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl MemoryExtractor for CountingExtractor {
    async fn extract_memories(
        &self,
        _context: &MemoryExtractionContext,
    ) -> Result<Vec<ExtractedMemory>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.clone())
    }
}

#[derive(Default)]
pub struct CollectingReporter {
    summaries: Mutex<Vec<PipelineSummary>>,
}

impl CollectingReporter {
    pub fn summaries(&self) -> Vec<PipelineSummary> {
        self.summaries.lock().unwrap().clone()
    }

    /// Polls until at least one summary arrived, or panics after two seconds.
    pub async fn wait_for_summary(&self) -> PipelineSummary {
        for _ in 0..200 {
            if let Some(summary) = self.summaries.lock().unwrap().first().cloned() {
                return summary;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no pipeline summary reported");
    }
}

impl PipelineReporter for CollectingReporter {
    fn report(&self, summary: PipelineSummary) {
        self.summaries.lock().unwrap().push(summary);
    }
}

/// A pipeline over in-memory adapters plus handles to inspect them.
pub struct Harness {
    pub service: DialoguePipelineService,
    pub llm: Arc<ScriptedLlm>,
    pub tts: Arc<MockTts>,
    pub repository: Arc<InMemoryConversationRepository>,
    pub counter: Arc<InMemoryConversationCounter>,
    pub extractor: Arc<CountingExtractor>,
    pub store: InMemoryVectorStore,
    pub reporter: Arc<CollectingReporter>,
}

pub struct HarnessBuilder {
    llm: Arc<ScriptedLlm>,
    tts: MockTts,
    embedding: Arc<dyn EmbeddingService>,
    extractor: CountingExtractor,
    memory_config: MemoryConfig,
    options: PipelineOptions,
}

impl HarnessBuilder {
    pub fn new(llm: Arc<ScriptedLlm>) -> Self {
        Self {
            llm,
            tts: MockTts::new(2),
            embedding: Arc::new(FixedEmbedding),
            extractor: CountingExtractor::default(),
            memory_config: MemoryConfig::default(),
            options: PipelineOptions::default(),
        }
    }

    pub fn tts(mut self, tts: MockTts) -> Self {
        self.tts = tts;
        self
    }

    pub fn embedding(mut self, embedding: Arc<dyn EmbeddingService>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn extracting(mut self, candidates: Vec<ExtractedMemory>) -> Self {
        self.extractor.candidates = candidates;
        self
    }

    pub fn extraction_threshold(mut self, threshold: u64) -> Self {
        self.memory_config.conversation_threshold = threshold;
        self
    }

    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Harness {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tts = Arc::new(self.tts);
        let repository = Arc::new(InMemoryConversationRepository::new());
        let counter = Arc::new(InMemoryConversationCounter::new());
        let extractor = Arc::new(self.extractor);
        let store = InMemoryVectorStore::new();
        let reporter = Arc::new(CollectingReporter::default());

        let memory_retrieval = Arc::new(MemoryRetrievalService::new(
            self.embedding.clone(),
            Arc::new(store.clone()),
            clock.clone(),
            &self.memory_config,
        ));
        let memory_extraction = Arc::new(MemoryExtractionService::new(
            counter.clone(),
            repository.clone(),
            memory_retrieval.clone(),
            extractor.clone(),
            self.embedding,
            Arc::new(store.clone()),
            clock.clone(),
            &self.memory_config,
        ));

        let service = DialoguePipelineService::new(
            PipelineDependencies {
                llm: self.llm.clone(),
                tts: tts.clone(),
                repository: repository.clone(),
                counter: counter.clone(),
                memory_retrieval,
                memory_extraction,
                monitor: DialoguePipelineMonitor::new(reporter.clone(), clock.clone()),
                clock,
            },
            self.options,
        );

        Harness {
            service,
            llm: self.llm,
            tts,
            repository,
            counter,
            extractor,
            store,
            reporter,
        }
    }
}
