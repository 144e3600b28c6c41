//! # dialogue-core
//!
//! Core types shared by every crate of the dialogue pipeline: conversation turns,
//! retrieval context, the [`Clock`] abstraction, [`DialogueError`] and tracing initialization.
//! Transport-agnostic; used by storage, memory, tts and dialogue.

pub mod clock;
pub mod error;
pub mod logger;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DialogueError, Result};
pub use logger::init_tracing;
pub use types::{
    ConversationContext, ConversationTurn, RetrievalContext, RetrievalDocument, SimilarityScore,
};
