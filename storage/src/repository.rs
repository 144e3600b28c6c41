use async_trait::async_trait;
use dialogue_core::ConversationTurn;

use crate::error::StorageError;

/// Append-only log of conversation turns.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Inserts the turn, or replaces the stored turn with the same id. Returns the stored turn.
    async fn save(&self, turn: &ConversationTurn) -> Result<ConversationTurn, StorageError>;
    /// The `limit` most recent turns, oldest first.
    async fn find_recent(&self, limit: usize) -> Result<Vec<ConversationTurn>, StorageError>;
    /// Every turn, oldest first.
    async fn find_all(&self) -> Result<Vec<ConversationTurn>, StorageError>;
}

/// Counter of completed turns. `increment` must be atomic across concurrent callers.
#[async_trait]
pub trait ConversationCounter: Send + Sync {
    /// Adds one and returns the new value.
    async fn increment(&self) -> Result<i64, StorageError>;
    /// Current value; 0 if never incremented.
    async fn get(&self) -> Result<i64, StorageError>;
    async fn reset(&self) -> Result<(), StorageError>;
}
