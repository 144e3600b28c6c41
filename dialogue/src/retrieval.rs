//! Keyword retrieval over earlier conversation turns.

use std::collections::HashSet;
use std::sync::Arc;

use dialogue_core::{RetrievalContext, RetrievalDocument, SimilarityScore};
use storage::{ConversationRepository, StorageError};
use tracing::{debug, instrument};

/// How many recent turns are scanned per requested document.
const SCAN_FACTOR: usize = 10;

fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Number of distinct lowercase words shared by `query` and `candidate`.
pub fn keyword_overlap(query: &str, candidate: &str) -> u32 {
    let query_words = tokenize(query);
    let count = tokenize(candidate)
        .iter()
        .filter(|w| query_words.contains(*w))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Scores recent turns against the query by word overlap.
pub struct ConversationRetriever {
    repository: Arc<dyn ConversationRepository>,
}

impl ConversationRetriever {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self { repository }
    }

    /// Up to `top_k` earlier queries sharing at least one word with `query`, best first.
    ///
    /// The turn with id `exclude_id` (the request's own turn) is skipped.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        exclude_id: Option<&str>,
    ) -> Result<RetrievalContext, StorageError> {
        if top_k == 0 {
            return Ok(RetrievalContext::empty(query));
        }
        let turns = self
            .repository
            .find_recent(top_k.saturating_mul(SCAN_FACTOR))
            .await?;

        let mut documents: Vec<RetrievalDocument> = turns
            .iter()
            .filter(|turn| Some(turn.id.as_str()) != exclude_id)
            .map(|turn| {
                RetrievalDocument::new(
                    turn.query.clone(),
                    SimilarityScore::new(keyword_overlap(query, &turn.query)),
                )
            })
            .filter(RetrievalDocument::is_relevant)
            .collect();
        // Stable: ties keep oldest-first order.
        documents.sort_by(|a, b| b.score.cmp(&a.score));
        documents.truncate(top_k);

        debug!(scanned = turns.len(), documents = documents.len(), "step: conversation retrieval");
        Ok(RetrievalContext::new(query, documents))
    }
}
