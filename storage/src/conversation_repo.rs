//! Conversation turn repository backed by SQLite.

use async_trait::async_trait;
use dialogue_core::ConversationTurn;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::ConversationTurnRecord;
use crate::repository::ConversationRepository;
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct SqliteConversationRepository {
    pool_manager: SqlitePoolManager,
}

impl SqliteConversationRepository {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        Self::from_pool(pool_manager).await
    }

    /// Shares an existing pool (e.g. with [`crate::SqliteConversationCounter`]).
    pub async fn from_pool(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating conversation_turns table if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_turns (
                id TEXT PRIMARY KEY,
                query TEXT NOT NULL,
                response TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversation_turns_created_at ON conversation_turns(created_at)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ConversationRepository for SqliteConversationRepository {
    async fn save(&self, turn: &ConversationTurn) -> Result<ConversationTurn, StorageError> {
        let record = ConversationTurnRecord::from(turn);

        sqlx::query(
            r#"
            INSERT INTO conversation_turns (id, query, response, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET response = excluded.response
            "#,
        )
        .bind(&record.id)
        .bind(&record.query)
        .bind(&record.response)
        .bind(record.created_at)
        .execute(self.pool_manager.pool())
        .await?;

        debug!(
            turn_id = %record.id,
            has_response = record.response.is_some(),
            "Saved conversation turn"
        );
        Ok(turn.clone())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<ConversationTurn>, StorageError> {
        let limit = i64::try_from(limit)
            .map_err(|_| StorageError::Invalid(format!("limit out of range: {}", limit)))?;

        let records: Vec<ConversationTurnRecord> = sqlx::query_as(
            r#"
            SELECT id, query, response, created_at FROM (
                SELECT id, query, response, created_at, rowid AS seq
                FROM conversation_turns
                ORDER BY created_at DESC, seq DESC
                LIMIT ?
            )
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool_manager.pool())
        .await?;

        Ok(records.into_iter().map(ConversationTurn::from).collect())
    }

    async fn find_all(&self) -> Result<Vec<ConversationTurn>, StorageError> {
        let records: Vec<ConversationTurnRecord> = sqlx::query_as(
            "SELECT id, query, response, created_at FROM conversation_turns ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(self.pool_manager.pool())
        .await?;

        Ok(records.into_iter().map(ConversationTurn::from).collect())
    }
}
