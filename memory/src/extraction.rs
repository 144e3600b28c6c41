//! Periodic memory extraction from recent conversation.

use std::sync::Arc;

use dialogue_core::Clock;
use embedding::EmbeddingService;
use memory_core::{Memory, MemoryExtractionContext, MemoryExtractor, VectorMemoryStore};
use storage::{ConversationCounter, ConversationRepository};
use tracing::{debug, info, instrument};

use crate::config::MemoryConfig;
use crate::retrieval::MemoryRetrievalService;

/// Existing memories handed to the extractor for deduplication.
const DEDUP_MEMORY_LIMIT: usize = 10;

/// What one `check_and_extract` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Counter was 0 or not a multiple of the threshold.
    Skipped { count: i64 },
    /// An extraction pass ran and stored `stored` new memories.
    Extracted { count: i64, stored: usize },
}

pub struct MemoryExtractionService {
    counter: Arc<dyn ConversationCounter>,
    repository: Arc<dyn ConversationRepository>,
    retrieval: Arc<MemoryRetrievalService>,
    extractor: Arc<dyn MemoryExtractor>,
    embedding: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorMemoryStore>,
    clock: Arc<dyn Clock>,
    threshold: u64,
}

impl MemoryExtractionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        counter: Arc<dyn ConversationCounter>,
        repository: Arc<dyn ConversationRepository>,
        retrieval: Arc<MemoryRetrievalService>,
        extractor: Arc<dyn MemoryExtractor>,
        embedding: Arc<dyn EmbeddingService>,
        store: Arc<dyn VectorMemoryStore>,
        clock: Arc<dyn Clock>,
        config: &MemoryConfig,
    ) -> Self {
        Self {
            counter,
            repository,
            retrieval,
            extractor,
            embedding,
            store,
            clock,
            threshold: config.conversation_threshold.max(1),
        }
    }

    fn is_due(&self, count: i64) -> bool {
        count > 0 && (count as u64) % self.threshold == 0
    }

    /// Runs one extraction pass if the completed-turn count is a positive multiple of the threshold.
    ///
    /// Loads the last `threshold` turns, fetches up to 10 related memories for deduplication,
    /// asks the extractor for candidates, then embeds and stores each candidate as a new memory.
    #[instrument(skip(self))]
    pub async fn check_and_extract(&self) -> Result<ExtractionOutcome, anyhow::Error> {
        let count = self.counter.get().await?;
        if !self.is_due(count) {
            debug!(count, threshold = self.threshold, "step: extraction not due");
            return Ok(ExtractionOutcome::Skipped { count });
        }

        let limit = usize::try_from(self.threshold).unwrap_or(usize::MAX);
        let recent_turns = self.repository.find_recent(limit).await?;
        if recent_turns.is_empty() {
            return Ok(ExtractionOutcome::Extracted { count, stored: 0 });
        }

        let combined = recent_turns
            .iter()
            .map(|t| t.query.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let existing = self
            .retrieval
            .retrieve_memories(&combined, DEDUP_MEMORY_LIMIT)
            .await?;

        let context = MemoryExtractionContext::new(recent_turns, existing.all().cloned().collect());
        let candidates = self.extractor.extract_memories(&context).await?;
        info!(
            count,
            turns = context.recent_turns.len(),
            existing = context.existing_memories.len(),
            candidates = candidates.len(),
            "step: extraction candidates received"
        );
        if candidates.is_empty() {
            return Ok(ExtractionOutcome::Extracted { count, stored: 0 });
        }

        let now = self.clock.now();
        let memories: Vec<Memory> = candidates.into_iter().map(|c| c.into_memory(now)).collect();
        let contents: Vec<String> = memories.iter().map(|m| m.content.clone()).collect();
        let vectors = self.embedding.embed_batch(&contents).await?;
        if vectors.len() != memories.len() {
            anyhow::bail!(
                "Expected {} embeddings, got {}",
                memories.len(),
                vectors.len()
            );
        }

        for (memory, vector) in memories.iter().zip(vectors.iter()) {
            self.store.upsert(memory, vector).await?;
        }

        info!(count, stored = memories.len(), "step: extraction stored memories");
        Ok(ExtractionOutcome::Extracted {
            count,
            stored: memories.len(),
        })
    }
}
