//! Tests for the conversation and retrieval value types in [`dialogue_core::types`].
//!
//! Covers: response attachment by copy, answered-turn filtering, relevance of scores.

use chrono::Utc;
use dialogue_core::{ConversationContext, ConversationTurn, RetrievalDocument, SimilarityScore};

/// **Test: with_response returns a copy and leaves the original untouched.**
///
/// **Setup:** A fresh turn without response.
/// **Action:** `with_response("hi there")`.
/// **Expected:** Copy has same id/query/created_at and the response; original still has none.
#[test]
fn with_response_copies_turn() {
    let turn = ConversationTurn::new("hello", Utc::now());
    let answered = turn.with_response("hi there");

    assert_eq!(answered.id, turn.id);
    assert_eq!(answered.query, "hello");
    assert_eq!(answered.created_at, turn.created_at);
    assert_eq!(answered.response.as_deref(), Some("hi there"));
    assert!(turn.response.is_none());
}

/// **Test: Generated ids are unique.**
#[test]
fn new_turns_get_distinct_ids() {
    let a = ConversationTurn::new("a", Utc::now());
    let b = ConversationTurn::new("a", Utc::now());
    assert_ne!(a.id, b.id);
}

/// **Test: answered() skips turns without a response, keeping order.**
#[test]
fn answered_filters_pending_turns() {
    let now = Utc::now();
    let first = ConversationTurn::new("one", now).with_response("1");
    let pending = ConversationTurn::new("two", now);
    let third = ConversationTurn::new("three", now).with_response("3");
    let ctx = ConversationContext::new(vec![first.clone(), pending, third.clone()]);

    let answered: Vec<_> = ctx.answered().cloned().collect();
    assert_eq!(answered, vec![first, third]);
    assert_eq!(ctx.len(), 3);
}

/// **Test: Only scores above zero are relevant.**
#[test]
fn similarity_score_relevance() {
    assert!(!SimilarityScore::new(0).is_relevant());
    assert!(SimilarityScore::new(1).is_relevant());
    assert!(RetrievalDocument::new("doc", SimilarityScore::new(2)).is_relevant());
    assert!(SimilarityScore::new(3) > SimilarityScore::new(2));
}
