//! # Memory Core
//!
//! Core types and ports for long-term memories distilled from conversation.
//! Used by the `memory` crate (retrieval and extraction services) and by store backends.
//!
//! ## Modules
//!
//! - [`types`] - Memory, MemoryType, ExtractedMemory, MemoryRetrievalResult, MemoryExtractionContext
//! - [`store`] - VectorMemoryStore trait
//! - [`extractor`] - MemoryExtractor trait
//! - [`error`] - MemoryError (validation of extracted candidates)

pub mod error;
pub mod extractor;
pub mod store;
pub mod types;

pub use error::*;
pub use extractor::*;
pub use store::*;
pub use types::*;
