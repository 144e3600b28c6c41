//! Memory value types.

use chrono::{DateTime, Utc};
use dialogue_core::ConversationTurn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::MemoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryType {
    /// Something the user lived through or did.
    Experiential,
    /// A stable fact about the user.
    Factual,
}

impl MemoryType {
    pub const ALL: [MemoryType; 2] = [MemoryType::Experiential, MemoryType::Factual];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Experiential => "EXPERIENTIAL",
            MemoryType::Factual => "FACTUAL",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EXPERIENTIAL" => Ok(MemoryType::Experiential),
            "FACTUAL" => Ok(MemoryType::Factual),
            other => Err(MemoryError::UnknownType(other.to_string())),
        }
    }
}

fn clamp_importance(importance: f64) -> f64 {
    if importance.is_nan() {
        0.0
    } else {
        importance.clamp(0.0, 1.0)
    }
}

/// A durable fact or experience. Content is fixed at creation; only access fields change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub memory_type: MemoryType,
    pub content: String,
    pub importance: f64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
}

impl Memory {
    /// New memory with a generated id; importance is clamped to [0, 1].
    pub fn new(
        memory_type: MemoryType,
        content: impl Into<String>,
        importance: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            memory_type,
            content: content.into(),
            importance: clamp_importance(importance),
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
        }
    }

    /// Copy reflecting one more access: importance raised by `boost` (capped at 1.0, never lowered),
    /// access count + 1, last access stamped to `now`.
    pub fn reinforced(&self, boost: f64, now: DateTime<Utc>) -> Self {
        let boosted = clamp_importance(self.importance + boost.max(0.0));
        Self {
            importance: boosted.max(self.importance),
            access_count: self.access_count.saturating_add(1),
            last_accessed_at: now,
            ..self.clone()
        }
    }

    /// Copy with the given access fields. Importance is clamped and the access count never goes down.
    pub fn with_access(
        &self,
        importance: f64,
        last_accessed_at: DateTime<Utc>,
        access_count: u64,
    ) -> Self {
        Self {
            importance: clamp_importance(importance),
            last_accessed_at,
            access_count: access_count.max(self.access_count),
            ..self.clone()
        }
    }

    /// Whole hours since the last access; 0 if the access lies in the future.
    pub fn hours_since_access(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_accessed_at).num_hours().max(0)
    }

    /// `importance * exp(-recency_weight * hours_since_access / 24)`.
    pub fn ranked_score(&self, now: DateTime<Utc>, recency_weight: f64) -> f64 {
        let hours = self.hours_since_access(now) as f64;
        self.importance * (-recency_weight * hours / 24.0).exp()
    }
}

/// Candidate produced by an extractor. Becomes exactly one new [`Memory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMemory {
    pub memory_type: MemoryType,
    pub content: String,
    pub importance: f64,
    pub reasoning: String,
}

impl ExtractedMemory {
    pub fn new(
        memory_type: MemoryType,
        content: impl Into<String>,
        importance: f64,
        reasoning: impl Into<String>,
    ) -> Result<Self, MemoryError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(MemoryError::EmptyContent);
        }
        if !(0.0..=1.0).contains(&importance) {
            return Err(MemoryError::InvalidImportance(importance));
        }
        Ok(Self {
            memory_type,
            content,
            importance,
            reasoning: reasoning.into(),
        })
    }

    pub fn into_memory(self, now: DateTime<Utc>) -> Memory {
        Memory::new(self.memory_type, self.content, self.importance, now)
    }
}

/// Retrieved memories grouped by type, each group in ranking order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRetrievalResult {
    pub experiential: Vec<Memory>,
    pub factual: Vec<Memory>,
}

impl MemoryRetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Splits `memories` by type, keeping relative order.
    pub fn from_memories(memories: Vec<Memory>) -> Self {
        let (experiential, factual) = memories
            .into_iter()
            .partition(|m| m.memory_type == MemoryType::Experiential);
        Self {
            experiential,
            factual,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.experiential.is_empty() && self.factual.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.experiential.len() + self.factual.len()
    }

    pub fn all(&self) -> impl Iterator<Item = &Memory> {
        self.experiential.iter().chain(self.factual.iter())
    }
}

/// Input of one extraction pass.
#[derive(Debug, Clone, Default)]
pub struct MemoryExtractionContext {
    pub recent_turns: Vec<ConversationTurn>,
    pub existing_memories: Vec<Memory>,
}

impl MemoryExtractionContext {
    pub fn new(recent_turns: Vec<ConversationTurn>, existing_memories: Vec<Memory>) -> Self {
        Self {
            recent_turns,
            existing_memories,
        }
    }
}
