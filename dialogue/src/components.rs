//! Component factory: builds the pipeline and its adapters from config.

use anyhow::Result;
use dialogue_core::{Clock, SystemClock};
use llm_client::{LlmClient, OpenAILlmClient};
use memory::{
    LlmMemoryExtractor, MemoryExtractionService, MemoryRetrievalService, VectorMemoryStore,
};
use memory_inmemory::InMemoryVectorStore;
use openai_embedding::OpenAIEmbedding;
use std::sync::Arc;
use storage::{SqliteConversationCounter, SqliteConversationRepository, SqlitePoolManager};
use tracing::{error, info, instrument};
use tts::{LoadBalancedTtsClient, LoggingFailureSink, TtsLoadBalancer};

use crate::config::AppConfig;
use crate::monitor::{DialoguePipelineMonitor, LoggingPipelineReporter};
use crate::pipeline::{DialoguePipelineService, PipelineDependencies, PipelineOptions};

/// What the binary needs after startup.
pub struct DialogueComponents {
    pub pipeline: DialoguePipelineService,
    pub balancer: Arc<TtsLoadBalancer>,
    pub memory_store: Arc<InMemoryVectorStore>,
}

pub fn pipeline_options(config: &AppConfig) -> PipelineOptions {
    PipelineOptions {
        model: config.llm.llm_model.clone(),
        system_prompt: config.llm.llm_system_prompt.clone(),
        memory_top_k: config.dialogue.memory_top_k,
        retrieval_top_k: config.dialogue.retrieval_top_k,
        history_limit: config.dialogue.history_limit,
        synthesis_concurrency: config.dialogue.synthesis_concurrency,
    }
}

/// Builds every adapter and the pipeline. Conversation turns and the counter share one SQLite pool.
#[instrument(skip(config))]
pub async fn build_components(config: &AppConfig) -> Result<DialogueComponents> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let pool = SqlitePoolManager::new(&config.dialogue.database_url)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                database_url = %config.dialogue.database_url,
                "Failed to open conversation database"
            );
            anyhow::anyhow!("Failed to open conversation database: {}", e)
        })?;
    let repository = Arc::new(SqliteConversationRepository::from_pool(pool.clone()).await?);
    let counter = Arc::new(SqliteConversationCounter::new(pool).await?);

    let llm: Arc<dyn LlmClient> = Arc::new(OpenAILlmClient::from_config(&config.llm));
    let embedding = Arc::new(OpenAIEmbedding::from_config(&config.embedding));
    info!(model = %embedding.model(), "Using OpenAI embedding for memory retrieval");

    let memory_store = Arc::new(InMemoryVectorStore::new());
    let store: Arc<dyn VectorMemoryStore> = memory_store.clone();
    let memory_retrieval = Arc::new(MemoryRetrievalService::new(
        embedding.clone(),
        store.clone(),
        clock.clone(),
        &config.memory,
    ));
    let extractor = Arc::new(LlmMemoryExtractor::new(
        llm.clone(),
        config.memory.extraction_model.clone(),
    ));
    let memory_extraction = Arc::new(MemoryExtractionService::new(
        counter.clone(),
        repository.clone(),
        memory_retrieval.clone(),
        extractor,
        embedding,
        store,
        clock.clone(),
        &config.memory,
    ));

    let balancer = Arc::new(TtsLoadBalancer::new(
        config.tts.build_endpoints(),
        clock.clone(),
        Arc::new(LoggingFailureSink),
        config.tts.load_balancer,
    )?);
    let tts = Arc::new(
        LoadBalancedTtsClient::new(balancer.clone(), config.tts.voice.clone())
            .with_request_timeout(config.tts.request_timeout)
            .with_warmup_timeout(config.tts.warmup_timeout),
    );
    info!(
        endpoints = balancer.endpoints().len(),
        voice_id = %config.tts.voice.id,
        format = config.tts.voice.output_format.as_str(),
        "TTS client ready"
    );

    let monitor = DialoguePipelineMonitor::new(Arc::new(LoggingPipelineReporter), clock.clone());
    let pipeline = DialoguePipelineService::new(
        PipelineDependencies {
            llm,
            tts,
            repository,
            counter,
            memory_retrieval,
            memory_extraction,
            monitor,
            clock,
        },
        pipeline_options(config),
    );

    Ok(DialogueComponents {
        pipeline,
        balancer,
        memory_store,
    })
}
