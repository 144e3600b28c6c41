//! # Memory Crate
//!
//! Long-term memory services for the dialogue pipeline.
//!
//! ## Modules
//!
//! - [`retrieval`] - [`MemoryRetrievalService`]: embed, search, rank by importance and recency, reinforce
//! - [`extraction`] - [`MemoryExtractionService`]: every N completed turns, distill new memories
//! - [`llm_extractor`] - [`LlmMemoryExtractor`]: [`memory_core::MemoryExtractor`] backed by an LLM
//! - [`config`] - [`MemoryConfig`]
//!
//! ## External Interactions
//!
//! - **Embedding service**: query and memory embeddings
//! - **Vector store**: candidate search and access updates
//! - **Conversation repository / counter**: recent turns and the completed-turn count
//! - **LLM**: memory extraction prompt

pub mod config;
pub mod extraction;
pub mod llm_extractor;
pub mod retrieval;

pub use config::MemoryConfig;
pub use extraction::{ExtractionOutcome, MemoryExtractionService};
pub use llm_extractor::LlmMemoryExtractor;
pub use retrieval::MemoryRetrievalService;

pub use memory_core::{
    ExtractedMemory, Memory, MemoryExtractionContext, MemoryExtractor, MemoryRetrievalResult,
    MemoryType, VectorMemoryStore,
};
