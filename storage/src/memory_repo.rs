use async_trait::async_trait;
use dialogue_core::ConversationTurn;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::repository::ConversationRepository;

/// In-process turn log kept in insertion order. For tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryConversationRepository {
    turns: RwLock<Vec<ConversationTurn>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn save(&self, turn: &ConversationTurn) -> Result<ConversationTurn, StorageError> {
        let mut turns = self.turns.write().await;
        match turns.iter_mut().find(|t| t.id == turn.id) {
            Some(existing) => *existing = turn.clone(),
            None => turns.push(turn.clone()),
        }
        Ok(turn.clone())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<ConversationTurn>, StorageError> {
        let turns = self.turns.read().await;
        let start = turns.len().saturating_sub(limit);
        Ok(turns[start..].to_vec())
    }

    async fn find_all(&self) -> Result<Vec<ConversationTurn>, StorageError> {
        Ok(self.turns.read().await.clone())
    }
}
