//! Conversation and retrieval value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One query/response exchange. The response is filled once via [`ConversationTurn::with_response`],
/// which returns a copy; a stored turn is never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub query: String,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// New turn without a response, with a generated id.
    pub fn new(query: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            response: None,
            created_at,
        }
    }

    pub fn with_response(&self, response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            ..self.clone()
        }
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }
}

/// Recent turns, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationContext {
    pub turns: Vec<ConversationTurn>,
}

impl ConversationContext {
    pub fn new(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Turns that already carry a response, in chronological order.
    pub fn answered(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().filter(|t| t.has_response())
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Non-negative relevance score. A document is relevant iff its score is above zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimilarityScore(u32);

impl SimilarityScore {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_relevant(&self) -> bool {
        self.0 > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalDocument {
    pub content: String,
    pub score: SimilarityScore,
}

impl RetrievalDocument {
    pub fn new(content: impl Into<String>, score: SimilarityScore) -> Self {
        Self {
            content: content.into(),
            score,
        }
    }

    pub fn is_relevant(&self) -> bool {
        self.score.is_relevant()
    }
}

/// Documents retrieved for one query, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalContext {
    pub query: String,
    pub documents: Vec<RetrievalDocument>,
}

impl RetrievalContext {
    pub fn new(query: impl Into<String>, documents: Vec<RetrievalDocument>) -> Self {
        Self {
            query: query.into(),
            documents,
        }
    }

    pub fn empty(query: impl Into<String>) -> Self {
        Self::new(query, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}
