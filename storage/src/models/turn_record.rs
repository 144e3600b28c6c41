//! Row mapping for the `conversation_turns` table.

use chrono::{DateTime, Utc};
use dialogue_core::ConversationTurn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationTurnRecord {
    pub id: String,
    pub query: String,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ConversationTurn> for ConversationTurnRecord {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            id: turn.id.clone(),
            query: turn.query.clone(),
            response: turn.response.clone(),
            created_at: turn.created_at,
        }
    }
}

impl From<ConversationTurnRecord> for ConversationTurn {
    fn from(record: ConversationTurnRecord) -> Self {
        ConversationTurn {
            id: record.id,
            query: record.query,
            response: record.response,
            created_at: record.created_at,
        }
    }
}
