//! Integration tests for [`storage::SqliteConversationCounter`] and
//! [`storage::InMemoryConversationCounter`].

use std::sync::Arc;

use futures::future::join_all;
use storage::{
    ConversationCounter, InMemoryConversationCounter, SqliteConversationCounter, SqlitePoolManager,
};

/// **Test: A fresh counter reads 0; increment returns the new value; reset goes back to 0.**
#[tokio::test]
async fn test_sqlite_counter_lifecycle() {
    let pool = SqlitePoolManager::new("sqlite::memory:").await.unwrap();
    let counter = SqliteConversationCounter::new(pool).await.unwrap();

    assert_eq!(counter.get().await.unwrap(), 0);
    assert_eq!(counter.increment().await.unwrap(), 1);
    assert_eq!(counter.increment().await.unwrap(), 2);
    assert_eq!(counter.get().await.unwrap(), 2);

    counter.reset().await.unwrap();
    assert_eq!(counter.get().await.unwrap(), 0);
    assert_eq!(counter.increment().await.unwrap(), 1);
}

/// **Test: Concurrent increments are not lost.**
///
/// **Setup:** In-memory counter shared by 50 tasks.
/// **Action:** Every task calls `increment()` once.
/// **Expected:** Final value 50 and every returned value is distinct.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_memory_counter_concurrent_increments() {
    let counter = Arc::new(InMemoryConversationCounter::new());
    let handles = (0..50).map(|_| {
        let counter = counter.clone();
        tokio::spawn(async move { counter.increment().await.unwrap() })
    });

    let mut values: Vec<i64> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    values.sort_unstable();
    values.dedup();

    assert_eq!(values.len(), 50);
    assert_eq!(counter.get().await.unwrap(), 50);
}

/// **Test: with_value seeds the in-memory counter.**
#[tokio::test]
async fn test_in_memory_counter_with_value() {
    let counter = InMemoryConversationCounter::with_value(4);
    assert_eq!(counter.increment().await.unwrap(), 5);
    counter.reset().await.unwrap();
    assert_eq!(counter.get().await.unwrap(), 0);
}
