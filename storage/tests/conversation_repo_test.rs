//! Integration tests for [`storage::SqliteConversationRepository`] and
//! [`storage::InMemoryConversationRepository`].
//!
//! Covers save/upsert by id, `find_recent` ordering and limits, and `find_all` using in-memory
//! and file-backed SQLite databases.

use chrono::{Duration, Utc};
use dialogue_core::ConversationTurn;
use storage::{
    ConversationRepository, InMemoryConversationRepository, SqliteConversationRepository,
};

fn turns(count: usize) -> Vec<ConversationTurn> {
    let base = Utc::now();
    (0..count)
        .map(|i| ConversationTurn::new(format!("query {}", i), base + Duration::seconds(i as i64)))
        .collect()
}

/// **Test: find_recent returns the newest turns, oldest first.**
///
/// **Setup:** In-memory DB; save 5 turns with increasing created_at.
/// **Action:** `find_recent(3)`.
/// **Expected:** Queries 2, 3, 4 in that order.
#[tokio::test]
async fn test_find_recent_returns_latest_in_chronological_order() {
    let repo = SqliteConversationRepository::new("sqlite::memory:")
        .await
        .expect("Failed to create repository");

    for turn in turns(5) {
        repo.save(&turn).await.expect("Failed to save turn");
    }

    let recent = repo.find_recent(3).await.expect("Failed to load recent turns");
    let queries: Vec<_> = recent.iter().map(|t| t.query.as_str()).collect();
    assert_eq!(queries, vec!["query 2", "query 3", "query 4"]);
}

/// **Test: Saving a turn with a response replaces the stored turn instead of appending.**
///
/// **Setup:** In-memory DB; save a turn without response.
/// **Action:** Save `turn.with_response("answer")`.
/// **Expected:** `find_all` has one turn carrying the response.
#[tokio::test]
async fn test_save_with_response_upserts_by_id() {
    let repo = SqliteConversationRepository::new("sqlite::memory:")
        .await
        .expect("Failed to create repository");

    let turn = ConversationTurn::new("hello", Utc::now());
    repo.save(&turn).await.unwrap();
    repo.save(&turn.with_response("answer")).await.unwrap();

    let all = repo.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, turn.id);
    assert_eq!(all[0].response.as_deref(), Some("answer"));
}

/// **Test: Empty database yields empty results.**
#[tokio::test]
async fn test_empty_repository() {
    let repo = SqliteConversationRepository::new("sqlite::memory:")
        .await
        .unwrap();
    assert!(repo.find_recent(10).await.unwrap().is_empty());
    assert!(repo.find_all().await.unwrap().is_empty());
}

/// **Test: Data survives reopening a file-backed database.**
///
/// **Setup:** Temp dir; save 2 turns through one repository instance.
/// **Action:** Open a new repository on the same file; `find_all()`.
/// **Expected:** Both turns, oldest first.
#[tokio::test]
async fn test_file_database_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("dialogue.db").display());

    let saved = turns(2);
    {
        let repo = SqliteConversationRepository::new(&url).await.unwrap();
        for turn in &saved {
            repo.save(turn).await.unwrap();
        }
    }

    let reopened = SqliteConversationRepository::new(&url).await.unwrap();
    let all = reopened.find_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, saved[0].id);
    assert_eq!(all[1].id, saved[1].id);
}

/// **Test: In-memory repository keeps insertion order and replaces by id.**
#[tokio::test]
async fn test_in_memory_repository_semantics() {
    let repo = InMemoryConversationRepository::new();
    let saved = turns(4);
    for turn in &saved {
        repo.save(turn).await.unwrap();
    }
    repo.save(&saved[3].with_response("done")).await.unwrap();

    let recent = repo.find_recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, saved[2].id);
    assert_eq!(recent[1].response.as_deref(), Some("done"));
    assert_eq!(repo.find_all().await.unwrap().len(), 4);
    assert_eq!(repo.find_recent(100).await.unwrap().len(), 4);
}
