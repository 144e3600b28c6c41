//! Storage crate: conversation turn log and the conversation counter.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – ConversationTurnRecord (row mapping)
//! - [`repository`] – ConversationRepository and ConversationCounter ports
//! - [`conversation_repo`] – SqliteConversationRepository
//! - [`counter`] – SqliteConversationCounter, InMemoryConversationCounter
//! - [`memory_repo`] – InMemoryConversationRepository
//! - [`sqlite_pool`] – SqlitePoolManager

mod conversation_repo;
mod counter;
mod error;
mod memory_repo;
mod models;
mod repository;
mod sqlite_pool;

pub use conversation_repo::SqliteConversationRepository;
pub use counter::{InMemoryConversationCounter, SqliteConversationCounter};
pub use error::StorageError;
pub use memory_repo::InMemoryConversationRepository;
pub use models::ConversationTurnRecord;
pub use repository::{ConversationCounter, ConversationRepository};
pub use sqlite_pool::SqlitePoolManager;
