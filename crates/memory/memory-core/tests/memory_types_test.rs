//! Tests for memory value types in [`memory_core::types`].
//!
//! Covers importance clamping, reinforcement invariants, recency ranking, candidate validation,
//! and grouping by type.

use chrono::{Duration, Utc};
use memory_core::{ExtractedMemory, Memory, MemoryError, MemoryRetrievalResult, MemoryType};

/// **Test: Importance is clamped to [0, 1] on creation.**
#[test]
fn new_memory_clamps_importance() {
    let now = Utc::now();
    assert_eq!(Memory::new(MemoryType::Factual, "a", 1.7, now).importance, 1.0);
    assert_eq!(Memory::new(MemoryType::Factual, "a", -0.2, now).importance, 0.0);
    assert_eq!(Memory::new(MemoryType::Factual, "a", f64::NAN, now).importance, 0.0);
}

/// **Test: reinforced() caps at 1.0, bumps access count by one, stamps the access time.**
///
/// **Setup:** Memory with importance 0.98 and access count 3.
/// **Action:** `reinforced(0.05, later)`.
/// **Expected:** importance 1.0, access count 4, last_accessed_at = later, content unchanged.
#[test]
fn reinforced_caps_and_counts() {
    let created = Utc::now();
    let later = created + Duration::hours(5);
    let memory = Memory::new(MemoryType::Experiential, "went hiking", 0.98, created)
        .with_access(0.98, created, 3);

    let reinforced = memory.reinforced(0.05, later);

    assert_eq!(reinforced.importance, 1.0);
    assert_eq!(reinforced.access_count, 4);
    assert_eq!(reinforced.last_accessed_at, later);
    assert_eq!(reinforced.content, memory.content);
    assert_eq!(reinforced.id, memory.id);
}

/// **Test: with_access never lowers the access count.**
#[test]
fn with_access_keeps_count_monotonic() {
    let now = Utc::now();
    let memory = Memory::new(MemoryType::Factual, "x", 0.5, now).with_access(0.5, now, 7);
    assert_eq!(memory.with_access(0.4, now, 2).access_count, 7);
}

/// **Test: Ranking decays with whole hours since last access.**
///
/// **Expected:** Just accessed → score equals importance; 24h later → importance * e^-0.1;
/// 59 minutes later counts as 0 hours.
#[test]
fn ranked_score_decays_by_hours() {
    let now = Utc::now();
    let memory = Memory::new(MemoryType::Factual, "x", 0.8, now);

    assert!((memory.ranked_score(now, 0.1) - 0.8).abs() < 1e-12);
    assert!((memory.ranked_score(now + Duration::minutes(59), 0.1) - 0.8).abs() < 1e-12);
    let day_later = memory.ranked_score(now + Duration::hours(24), 0.1);
    assert!((day_later - 0.8 * (-0.1f64).exp()).abs() < 1e-12);
}

/// **Test: Candidate validation rejects blank content and out-of-range importance.**
#[test]
fn extracted_memory_validation() {
    assert_eq!(
        ExtractedMemory::new(MemoryType::Factual, "  ", 0.5, "r").unwrap_err(),
        MemoryError::EmptyContent
    );
    assert_eq!(
        ExtractedMemory::new(MemoryType::Factual, "x", 1.5, "r").unwrap_err(),
        MemoryError::InvalidImportance(1.5)
    );
    let candidate = ExtractedMemory::new(MemoryType::Experiential, "x", 0.6, "r").unwrap();
    let memory = candidate.into_memory(Utc::now());
    assert_eq!(memory.memory_type, MemoryType::Experiential);
    assert_eq!(memory.access_count, 0);
    assert_eq!(memory.importance, 0.6);
}

/// **Test: Memory types parse case-insensitively and reject unknown names.**
#[test]
fn memory_type_parsing() {
    assert_eq!("factual".parse::<MemoryType>().unwrap(), MemoryType::Factual);
    assert_eq!(" EXPERIENTIAL ".parse::<MemoryType>().unwrap(), MemoryType::Experiential);
    assert!("EPISODIC".parse::<MemoryType>().is_err());
}

/// **Test: Grouping keeps ranking order within each bucket.**
#[test]
fn retrieval_result_groups_by_type() {
    let now = Utc::now();
    let memories = vec![
        Memory::new(MemoryType::Factual, "f1", 0.9, now),
        Memory::new(MemoryType::Experiential, "e1", 0.8, now),
        Memory::new(MemoryType::Factual, "f2", 0.7, now),
    ];
    let result = MemoryRetrievalResult::from_memories(memories);

    let factual: Vec<_> = result.factual.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(factual, vec!["f1", "f2"]);
    assert_eq!(result.experiential.len(), 1);
    assert_eq!(result.total_count(), 3);
    assert!(!result.is_empty());
    assert!(MemoryRetrievalResult::empty().is_empty());
}
