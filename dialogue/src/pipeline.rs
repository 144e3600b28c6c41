//! Dialogue pipeline: one query in, a stream of reply tokens or sentence-ordered audio out.
//!
//! ## Audio ordering
//!
//! Each assembled sentence gets its own bounded chunk channel and a synthesis task. The
//! receivers are queued in sentence order and the output drains them one after another, so
//! synthesis of later sentences overlaps with playback of earlier ones while the emitted audio
//! stays strictly sequential. Permits are taken in sentence order, so the sentence being drained
//! always holds one.

use std::sync::Arc;
use std::task::Poll;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use dialogue_core::{
    Clock, ConversationContext, ConversationTurn, DialogueError, RetrievalContext,
};
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use llm_client::LlmClient;
use memory::{MemoryExtractionService, MemoryRetrievalResult, MemoryRetrievalService};
use prompt::ChatMessage;
use storage::{ConversationCounter, ConversationRepository};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, info_span, warn, Instrument};
use tts::TtsClient;

use crate::monitor::{DialoguePipelineMonitor, DialoguePipelineTracker, PipelineStage};
use crate::output_stream::{CompletionHook, OutputStage, PipelineStream};
use crate::retrieval::ConversationRetriever;
use crate::sentence_assembler::assemble;

/// Reply tokens, or base64 audio chunks.
pub type TextStream = BoxStream<'static, Result<String, DialogueError>>;
/// Raw audio chunks in sentence order.
pub type AudioChunkStream = BoxStream<'static, Result<Bytes, DialogueError>>;

type ChunkSender = mpsc::Sender<Result<Bytes, DialogueError>>;
type ChunkReceiver = mpsc::Receiver<Result<Bytes, DialogueError>>;
type Warmup = Shared<BoxFuture<'static, ()>>;

const TOKEN_BUFFER: usize = 64;
const SENTENCE_QUEUE: usize = 16;
const CHUNK_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub model: String,
    /// Replaces the default base instruction of the system prompt.
    pub system_prompt: Option<String>,
    pub memory_top_k: usize,
    pub retrieval_top_k: usize,
    pub history_limit: usize,
    pub synthesis_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            system_prompt: None,
            memory_top_k: 5,
            retrieval_top_k: 3,
            history_limit: 10,
            synthesis_concurrency: 3,
        }
    }
}

/// Collaborators of [`DialoguePipelineService`].
pub struct PipelineDependencies {
    pub llm: Arc<dyn LlmClient>,
    pub tts: Arc<dyn TtsClient>,
    pub repository: Arc<dyn ConversationRepository>,
    pub counter: Arc<dyn ConversationCounter>,
    pub memory_retrieval: Arc<MemoryRetrievalService>,
    pub memory_extraction: Arc<MemoryExtractionService>,
    pub monitor: DialoguePipelineMonitor,
    pub clock: Arc<dyn Clock>,
}

/// Top-level orchestrator. Cheap to clone; every request runs on its own tasks.
///
/// The `execute_*` operations must be called from within a Tokio runtime: they start the
/// request immediately and return its output stream. Dropping the stream cancels the request.
#[derive(Clone)]
pub struct DialoguePipelineService {
    llm: Arc<dyn LlmClient>,
    tts: Arc<dyn TtsClient>,
    repository: Arc<dyn ConversationRepository>,
    counter: Arc<dyn ConversationCounter>,
    memory_retrieval: Arc<MemoryRetrievalService>,
    memory_extraction: Arc<MemoryExtractionService>,
    retriever: Arc<ConversationRetriever>,
    monitor: DialoguePipelineMonitor,
    clock: Arc<dyn Clock>,
    options: Arc<PipelineOptions>,
}

impl DialoguePipelineService {
    pub fn new(deps: PipelineDependencies, options: PipelineOptions) -> Self {
        Self {
            retriever: Arc::new(ConversationRetriever::new(Arc::clone(&deps.repository))),
            llm: deps.llm,
            tts: deps.tts,
            repository: deps.repository,
            counter: deps.counter,
            memory_retrieval: deps.memory_retrieval,
            memory_extraction: deps.memory_extraction,
            monitor: deps.monitor,
            clock: deps.clock,
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Streams the reply as LLM tokens. No speech is synthesized.
    pub fn execute_text_only(&self, query: &str) -> TextStream {
        let tracker = self.monitor.create(query);
        info!(pipeline_id = %tracker.pipeline_id(), mode = "text", "Dialogue request started");

        let (tx, rx) = mpsc::channel(TOKEN_BUFFER);
        let span = info_span!("dialogue_text", pipeline_id = %tracker.pipeline_id());
        tokio::spawn(
            self.clone()
                .run_text(Arc::clone(&tracker), query.to_string(), tx)
                .instrument(span),
        );

        let hook = self.completion_hook(&tracker);
        PipelineStream::new(ReceiverStream::new(rx).boxed(), tracker, None, hook).boxed()
    }

    /// Streams the reply as audio chunks, sentence by sentence.
    pub fn execute_audio_streaming(&self, query: &str) -> AudioChunkStream {
        let tracker = self.monitor.create(query);
        info!(pipeline_id = %tracker.pipeline_id(), mode = "audio", "Dialogue request started");

        let warmup = self.start_warmup(&tracker);
        let (sentence_tx, sentence_rx) = mpsc::channel::<ChunkReceiver>(SENTENCE_QUEUE);
        let span = info_span!("dialogue_audio", pipeline_id = %tracker.pipeline_id());
        tokio::spawn(
            self.clone()
                .run_audio(Arc::clone(&tracker), query.to_string(), sentence_tx, warmup)
                .instrument(span),
        );

        let audio = ReceiverStream::new(sentence_rx).flat_map(ReceiverStream::new);
        let output = OutputStage {
            stage: PipelineStage::TtsSynthesis,
            counter: "audioChunks",
        };
        let hook = self.completion_hook(&tracker);
        PipelineStream::new(audio.boxed(), tracker, Some(output), hook).boxed()
    }

    /// [`Self::execute_audio_streaming`] with each chunk base64-encoded, for text-only transports.
    pub fn execute_streaming(&self, query: &str) -> TextStream {
        self.execute_audio_streaming(query)
            .map_ok(|chunk| STANDARD.encode(&chunk))
            .boxed()
    }

    async fn run_text(
        self,
        tracker: Arc<DialoguePipelineTracker>,
        query: String,
        tx: mpsc::Sender<Result<String, DialogueError>>,
    ) {
        let work = async {
            let (turn, messages) = self.prepare_prompt(&tracker, &query).await?;

            let llm_stage = tracker.begin_stage(PipelineStage::LlmCompletion);
            let mut tokens = match self.open_completion(&tracker, messages).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    llm_stage.fail(&e);
                    return Err(e);
                }
            };

            let mut response = String::new();
            while let Some(token) = tokens.next().await {
                let token = match token {
                    Ok(token) => token,
                    Err(e) => {
                        let error = DialogueError::Llm(e.to_string());
                        llm_stage.fail(&error);
                        return Err(error);
                    }
                };
                tracker.increment_stage_counter(PipelineStage::LlmCompletion, "tokenCount", 1);
                response.push_str(&token);
                if tx.send(Ok(token)).await.is_err() {
                    return Ok(());
                }
            }
            llm_stage.complete();

            tracker.record_llm_output(&response);
            self.persist_response(&tracker, &turn, response).await;
            Ok::<(), DialogueError>(())
        };

        tokio::select! {
            _ = tx.closed() => debug!("step: consumer went away"),
            result = work => {
                if let Err(error) = result {
                    warn!(error = %error, "Dialogue text pipeline failed");
                    let _ = tx.send(Err(error)).await;
                }
            }
        }
    }

    async fn run_audio(
        self,
        tracker: Arc<DialoguePipelineTracker>,
        query: String,
        sentence_tx: mpsc::Sender<ChunkReceiver>,
        warmup: Warmup,
    ) {
        let work = async {
            let (turn, messages) = self.prepare_prompt(&tracker, &query).await?;

            let llm_stage = tracker.begin_stage(PipelineStage::LlmCompletion);
            let tokens = match self.open_completion(&tracker, messages).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    llm_stage.fail(&e);
                    return Err(e);
                }
            };
            // The LLM stage ends with the token stream, not with synthesis backpressure.
            let counted = {
                let counting = Arc::clone(&tracker);
                let ending = Arc::clone(&tracker);
                tokens
                    .inspect_ok(move |_| {
                        counting.increment_stage_counter(PipelineStage::LlmCompletion, "tokenCount", 1)
                    })
                    .chain(stream::poll_fn(move |_| {
                        ending.complete_stage(PipelineStage::LlmCompletion);
                        Poll::Ready(None)
                    }))
            };

            let assembly_stage = tracker.begin_stage(PipelineStage::SentenceAssembly);
            let (ready_tx, ready_rx) = mpsc::unbounded_channel();

            // Reads the whole reply while synthesis waits for permits.
            let read = async move {
                let mut sentences = assemble(counted);
                while let Some(sentence) = sentences.next().await {
                    if ready_tx.send(sentence).is_err() {
                        break;
                    }
                }
            };

            let dispatch = async {
                let mut ready = ready_rx;
                let permits = Arc::new(Semaphore::new(self.options.synthesis_concurrency.max(1)));
                let mut assembled: Vec<String> = Vec::new();

                while let Some(sentence) = ready.recv().await {
                    let sentence = match sentence {
                        Ok(sentence) => sentence,
                        Err(e) => {
                            let error = DialogueError::Llm(e.to_string());
                            llm_stage.fail(&error);
                            assembly_stage.fail(&error);
                            return Err(error);
                        }
                    };
                    tracker.increment_stage_counter(PipelineStage::SentenceAssembly, "sentenceCount", 1);
                    tracker.record_llm_output(&sentence);
                    debug!(index = assembled.len(), len = sentence.len(), "step: sentence assembled");

                    // Waits while earlier sentences hold every permit.
                    let permit = Arc::clone(&permits)
                        .acquire_owned()
                        .await
                        .map_err(|e| DialogueError::Unknown(e.to_string()))?;
                    let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_BUFFER);
                    if sentence_tx.send(chunk_rx).await.is_err() {
                        return Ok(None);
                    }
                    tracker.start_stage(PipelineStage::TtsSynthesis);
                    self.spawn_synthesis(sentence.clone(), permit, chunk_tx, warmup.clone());
                    assembled.push(sentence);
                }
                llm_stage.complete();
                assembly_stage.complete();
                Ok::<_, DialogueError>(Some(assembled))
            };

            let ((), dispatched) = futures::join!(read, dispatch);
            let Some(assembled) = dispatched? else {
                return Ok(());
            };
            self.persist_response(&tracker, &turn, assembled.join(" ")).await;
            Ok::<(), DialogueError>(())
        };

        tokio::select! {
            _ = sentence_tx.closed() => debug!("step: consumer went away"),
            result = work => {
                if let Err(error) = result {
                    warn!(error = %error, "Dialogue audio pipeline failed");
                    // Queued after every sentence already dispatched.
                    let (error_tx, error_rx) = mpsc::channel(1);
                    let _ = error_tx.send(Err(error)).await;
                    let _ = sentence_tx.send(error_rx).await;
                }
            }
        }
    }

    fn spawn_synthesis(
        &self,
        sentence: String,
        permit: OwnedSemaphorePermit,
        chunk_tx: ChunkSender,
        warmup: Warmup,
    ) {
        let tts = Arc::clone(&self.tts);
        tokio::spawn(
            async move {
                let _permit = permit;
                let work = async {
                    warmup.await;
                    let mut audio = tts.stream_synthesize(&sentence);
                    while let Some(chunk) = audio.next().await {
                        match chunk {
                            Ok(chunk) => {
                                if chunk_tx.send(Ok(chunk)).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "Sentence synthesis failed");
                                let _ = chunk_tx.send(Err(DialogueError::Tts(e.to_string()))).await;
                                return;
                            }
                        }
                    }
                };
                tokio::select! {
                    _ = chunk_tx.closed() => debug!("step: synthesis abandoned"),
                    _ = work => {}
                }
            }
            .in_current_span(),
        );
    }

    /// Starts TTS warm-up now; every synthesis of the request awaits the same run.
    fn start_warmup(&self, tracker: &Arc<DialoguePipelineTracker>) -> Warmup {
        let tts = Arc::clone(&self.tts);
        let tracker = Arc::clone(tracker);
        let warmup = async move {
            if let Err(e) = tracker.trace(PipelineStage::TtsPreparation, tts.prepare()).await {
                warn!(pipeline_id = %tracker.pipeline_id(), error = %e, "TTS warm-up failed");
                tracker.record_pipeline_attribute("ttsWarmupError", e.to_string());
            }
        }
        .boxed()
        .shared();
        tokio::spawn(warmup.clone());
        warmup
    }

    /// Persists the query, gathers context concurrently and builds the chat messages.
    async fn prepare_prompt(
        &self,
        tracker: &DialoguePipelineTracker,
        query: &str,
    ) -> Result<(ConversationTurn, Vec<ChatMessage>), DialogueError> {
        let turn = tracker
            .trace(PipelineStage::QueryPersistence, async {
                self.repository
                    .save(&ConversationTurn::new(query, self.clock.now()))
                    .await
                    .map_err(|e| DialogueError::Persistence(e.to_string()))
            })
            .await?;

        let (memories, documents, history) = tokio::join!(
            self.load_memories(tracker, query),
            self.load_documents(tracker, query, &turn.id),
            self.load_history(tracker),
        );

        let messages = tracker
            .trace(PipelineStage::PromptBuilding, async {
                Ok::<_, DialogueError>(self.build_messages(&memories, &documents, &history, query))
            })
            .await?;
        debug!(messages = messages.len(), "step: prompt built");
        Ok((turn, messages))
    }

    async fn load_memories(
        &self,
        tracker: &DialoguePipelineTracker,
        query: &str,
    ) -> MemoryRetrievalResult {
        let retrieval = self
            .memory_retrieval
            .retrieve_memories(query, self.options.memory_top_k);
        match tracker.trace(PipelineStage::MemoryRetrieval, retrieval).await {
            Ok(memories) => {
                tracker.record_stage_attribute(
                    PipelineStage::MemoryRetrieval,
                    "memoryCount",
                    memories.total_count(),
                );
                memories
            }
            Err(e) => {
                warn!(error = %e, "Memory retrieval failed; continuing without memories");
                tracker.record_pipeline_attribute("memoryRetrievalError", e.to_string());
                MemoryRetrievalResult::empty()
            }
        }
    }

    async fn load_documents(
        &self,
        tracker: &DialoguePipelineTracker,
        query: &str,
        own_turn_id: &str,
    ) -> RetrievalContext {
        let retrieval =
            self.retriever
                .retrieve(query, self.options.retrieval_top_k, Some(own_turn_id));
        match tracker.trace(PipelineStage::Retrieval, retrieval).await {
            Ok(context) => {
                tracker.record_stage_attribute(
                    PipelineStage::Retrieval,
                    "documentCount",
                    context.document_count(),
                );
                context
            }
            Err(e) => {
                warn!(error = %e, "Conversation retrieval failed; continuing without documents");
                tracker.record_pipeline_attribute("retrievalError", e.to_string());
                RetrievalContext::empty(query)
            }
        }
    }

    async fn load_history(&self, tracker: &DialoguePipelineTracker) -> ConversationContext {
        match self.repository.find_recent(self.options.history_limit).await {
            Ok(turns) => ConversationContext::new(turns),
            Err(e) => {
                warn!(error = %e, "Loading conversation history failed");
                tracker.record_pipeline_attribute("historyError", e.to_string());
                ConversationContext::empty()
            }
        }
    }

    fn build_messages(
        &self,
        memories: &MemoryRetrievalResult,
        documents: &RetrievalContext,
        history: &ConversationContext,
        query: &str,
    ) -> Vec<ChatMessage> {
        let system_prompt = prompt::build_system_prompt(
            self.options.system_prompt.as_deref(),
            memories.experiential.iter().map(|m| m.content.as_str()),
            memories.factual.iter().map(|m| m.content.as_str()),
            documents.documents.iter().map(|d| d.content.as_str()),
        );
        let pairs = history.answered().filter_map(|turn| {
            turn.response
                .as_deref()
                .map(|response| (turn.query.as_str(), response))
        });
        prompt::build_dialogue_messages(&system_prompt, pairs, query)
    }

    async fn open_completion(
        &self,
        tracker: &DialoguePipelineTracker,
        messages: Vec<ChatMessage>,
    ) -> Result<llm_client::TokenStream, DialogueError> {
        tracker.record_stage_attribute(
            PipelineStage::LlmCompletion,
            "model",
            self.options.model.clone(),
        );
        self.llm
            .stream_completion(messages, &self.options.model)
            .await
            .map_err(|e| DialogueError::Llm(e.to_string()))
    }

    /// Stores the turn again, now carrying the reply. Failure is logged, not surfaced.
    async fn persist_response(
        &self,
        tracker: &DialoguePipelineTracker,
        turn: &ConversationTurn,
        response: String,
    ) {
        match self.repository.save(&turn.with_response(response)).await {
            Ok(_) => debug!(turn_id = %turn.id, "step: response persisted"),
            Err(e) => {
                warn!(turn_id = %turn.id, error = %e, "Failed to persist response");
                tracker.record_pipeline_attribute("responsePersistenceError", e.to_string());
            }
        }
    }

    /// Counts the completed turn, then lets extraction decide whether a pass is due.
    /// Runs detached; nothing here reaches the caller.
    fn completion_hook(&self, tracker: &DialoguePipelineTracker) -> CompletionHook {
        let counter = Arc::clone(&self.counter);
        let extraction = Arc::clone(&self.memory_extraction);
        let pipeline_id = tracker.pipeline_id().to_string();
        Box::new(move || {
            let task = async move {
                let count = match counter.increment().await {
                    Ok(count) => count,
                    Err(e) => {
                        warn!(pipeline_id = %pipeline_id, error = %e, "Failed to count conversation");
                        return;
                    }
                };
                match extraction.check_and_extract().await {
                    Ok(outcome) => debug!(pipeline_id = %pipeline_id, count, ?outcome, "step: extraction checked"),
                    Err(e) => warn!(pipeline_id = %pipeline_id, error = %e, "Memory extraction failed"),
                }
            };
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(task);
                }
                Err(_) => warn!("No Tokio runtime; skipping post-turn bookkeeping"),
            }
        })
    }
}
