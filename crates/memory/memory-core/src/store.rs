//! # Vector Memory Storage
//!
//! The `VectorMemoryStore` trait is implemented by vector store backends (in-memory, remote vector DBs).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Memory, MemoryType};

/// Vector store for memories.
#[async_trait]
pub trait VectorMemoryStore: Send + Sync {
    /// Inserts the memory with its embedding, replacing any stored memory with the same id.
    async fn upsert(&self, memory: &Memory, vector: &[f32]) -> Result<Memory, anyhow::Error>;

    /// Up to `top_k` memories of the given types with `importance >= importance_threshold`,
    /// most similar to `query_vector` first.
    async fn search(
        &self,
        query_vector: &[f32],
        types: &[MemoryType],
        importance_threshold: f64,
        top_k: usize,
    ) -> Result<Vec<Memory>, anyhow::Error>;

    /// Persists the access fields of a stored memory. Content is never changed.
    async fn update_importance(
        &self,
        id: &str,
        importance: f64,
        last_accessed_at: DateTime<Utc>,
        access_count: u64,
    ) -> Result<(), anyhow::Error>;
}
