use async_trait::async_trait;

use crate::types::{ExtractedMemory, MemoryExtractionContext};

/// Turns recent conversation into candidate memories.
#[async_trait]
pub trait MemoryExtractor: Send + Sync {
    /// Zero or more candidates; `context.existing_memories` is given for deduplication.
    async fn extract_memories(
        &self,
        context: &MemoryExtractionContext,
    ) -> Result<Vec<ExtractedMemory>, anyhow::Error>;
}
