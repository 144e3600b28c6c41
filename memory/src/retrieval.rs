//! Memory retrieval: embed the query, search candidates, rank by importance and recency,
//! then reinforce what was returned.

use std::sync::Arc;

use dialogue_core::Clock;
use embedding::EmbeddingService;
use futures::future::try_join_all;
use memory_core::{Memory, MemoryRetrievalResult, MemoryType, VectorMemoryStore};
use tracing::{debug, info, instrument};

use crate::config::MemoryConfig;

pub struct MemoryRetrievalService {
    embedding: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorMemoryStore>,
    clock: Arc<dyn Clock>,
    importance_boost: f64,
    importance_threshold: f64,
    recency_weight: f64,
}

impl MemoryRetrievalService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        store: Arc<dyn VectorMemoryStore>,
        clock: Arc<dyn Clock>,
        config: &MemoryConfig,
    ) -> Self {
        Self {
            embedding,
            store,
            clock,
            importance_boost: config.importance_boost,
            importance_threshold: config.importance_threshold,
            recency_weight: config.recency_weight,
        }
    }

    /// Returns up to `top_k` memories grouped by type.
    ///
    /// Every returned memory is reinforced (importance boost, access count + 1, last access = now)
    /// and the update is persisted before this returns. The returned memories carry the new values.
    #[instrument(skip(self, query), fields(query_len = query.len(), top_k))]
    pub async fn retrieve_memories(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<MemoryRetrievalResult, anyhow::Error> {
        if top_k == 0 {
            return Ok(MemoryRetrievalResult::empty());
        }

        let vector = self.embedding.embed(query).await?;
        let candidates = self
            .store
            .search(
                &vector,
                &MemoryType::ALL,
                self.importance_threshold,
                top_k.saturating_mul(2),
            )
            .await?;

        let now = self.clock.now();
        let ranked = rank(candidates, now, self.recency_weight, top_k);
        debug!(count = ranked.len(), "step: memory ranked candidates");

        let reinforced: Vec<Memory> = ranked
            .iter()
            .map(|m| m.reinforced(self.importance_boost, now))
            .collect();

        try_join_all(reinforced.iter().map(|m| {
            self.store
                .update_importance(&m.id, m.importance, m.last_accessed_at, m.access_count)
        }))
        .await?;

        let result = MemoryRetrievalResult::from_memories(reinforced);
        info!(
            experiential = result.experiential.len(),
            factual = result.factual.len(),
            "step: memory retrieval done"
        );
        Ok(result)
    }
}

/// Sorts by ranked score (highest first, stable for ties) and keeps `top_k`.
fn rank(
    candidates: Vec<Memory>,
    now: chrono::DateTime<chrono::Utc>,
    recency_weight: f64,
    top_k: usize,
) -> Vec<Memory> {
    let mut scored: Vec<(f64, Memory)> = candidates
        .into_iter()
        .map(|m| (m.ranked_score(now, recency_weight), m))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored.into_iter().map(|(_, m)| m).collect()
}
