//! Conversation counter: SQLite-backed and in-process implementations.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

use crate::error::StorageError;
use crate::repository::ConversationCounter;
use crate::sqlite_pool::SqlitePoolManager;

const CONVERSATION_COUNTER_KEY: &str = "conversation_count";

/// Counter row in the `counters` table, incremented with a single atomic upsert.
#[derive(Clone)]
pub struct SqliteConversationCounter {
    pool_manager: SqlitePoolManager,
}

impl SqliteConversationCounter {
    pub async fn new(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS counters (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool_manager.pool())
        .await?;
        Ok(Self { pool_manager })
    }
}

#[async_trait]
impl ConversationCounter for SqliteConversationCounter {
    async fn increment(&self) -> Result<i64, StorageError> {
        let (value,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO counters (name, value) VALUES (?, 1)
            ON CONFLICT(name) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(CONVERSATION_COUNTER_KEY)
        .fetch_one(self.pool_manager.pool())
        .await?;
        debug!(count = value, "Conversation counter incremented");
        Ok(value)
    }

    async fn get(&self) -> Result<i64, StorageError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM counters WHERE name = ?")
            .bind(CONVERSATION_COUNTER_KEY)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(row.map(|(v,)| v).unwrap_or(0))
    }

    async fn reset(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM counters WHERE name = ?")
            .bind(CONVERSATION_COUNTER_KEY)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(())
    }
}

/// Process-local counter.
#[derive(Debug, Default)]
pub struct InMemoryConversationCounter {
    value: AtomicI64,
}

impl InMemoryConversationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from `value`, e.g. to resume a count in tests.
    pub fn with_value(value: i64) -> Self {
        Self {
            value: AtomicI64::new(value),
        }
    }
}

#[async_trait]
impl ConversationCounter for InMemoryConversationCounter {
    async fn increment(&self) -> Result<i64, StorageError> {
        Ok(self.value.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn get(&self) -> Result<i64, StorageError> {
        Ok(self.value.load(Ordering::SeqCst))
    }

    async fn reset(&self) -> Result<(), StorageError> {
        self.value.store(0, Ordering::SeqCst);
        Ok(())
    }
}
