//! # In-Memory Vector Store
//!
//! In-process implementation of [`VectorMemoryStore`] for tests, development and single-process runs.
//! Similarity is cosine similarity between the stored embedding and the query vector.
//!
//! ## Thread Safety
//!
//! The store uses `Arc<RwLock<>>` so clones share the same entries.

use chrono::{DateTime, Utc};
use memory_core::{Memory, MemoryType, VectorMemoryStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct StoredMemory {
    memory: Memory,
    vector: Vec<f32>,
}

/// In-memory vector store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorStore {
    entries: Arc<RwLock<HashMap<String, StoredMemory>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored memories.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns the stored memory with the given id.
    pub async fn get(&self, id: &str) -> Option<Memory> {
        self.entries.read().await.get(id).map(|e| e.memory.clone())
    }

    /// Snapshot of every stored memory, in no particular order.
    pub async fn all(&self) -> Vec<Memory> {
        self.entries
            .read()
            .await
            .values()
            .map(|e| e.memory.clone())
            .collect()
    }

    /// Calculates cosine similarity between two vectors; 0 for empty or zero vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

#[async_trait::async_trait]
impl VectorMemoryStore for InMemoryVectorStore {
    async fn upsert(&self, memory: &Memory, vector: &[f32]) -> Result<Memory, anyhow::Error> {
        info!(
            id = %memory.id,
            memory_type = %memory.memory_type,
            importance = memory.importance,
            dimension = vector.len(),
            "step: memory InMemory upsert"
        );
        let mut entries = self.entries.write().await;
        entries.insert(
            memory.id.clone(),
            StoredMemory {
                memory: memory.clone(),
                vector: vector.to_vec(),
            },
        );
        Ok(memory.clone())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        types: &[MemoryType],
        importance_threshold: f64,
        top_k: usize,
    ) -> Result<Vec<Memory>, anyhow::Error> {
        let entries = self.entries.read().await;

        let mut scored: Vec<(f32, &StoredMemory)> = entries
            .values()
            .filter(|e| types.contains(&e.memory.memory_type))
            .filter(|e| e.memory.importance >= importance_threshold)
            .map(|e| (Self::cosine_similarity(query_vector, &e.vector), e))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let results: Vec<Memory> = scored
            .into_iter()
            .take(top_k)
            .map(|(_, e)| e.memory.clone())
            .collect();

        info!(
            dimension = query_vector.len(),
            top_k,
            importance_threshold,
            count = results.len(),
            "step: memory InMemory search done"
        );
        Ok(results)
    }

    async fn update_importance(
        &self,
        id: &str,
        importance: f64,
        last_accessed_at: DateTime<Utc>,
        access_count: u64,
    ) -> Result<(), anyhow::Error> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(id) {
            Some(entry) => {
                entry.memory = entry
                    .memory
                    .with_access(importance, last_accessed_at, access_count);
                debug!(id = %id, importance, access_count, "Memory access updated");
                Ok(())
            }
            None => Err(anyhow::anyhow!("Memory not found: {}", id)),
        }
    }
}
