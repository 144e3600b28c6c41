//! [`MemoryExtractor`] that asks a language model for a JSON array of memory candidates.

use std::sync::Arc;

use async_trait::async_trait;
use llm_client::LlmClient;
use memory_core::{ExtractedMemory, Memory, MemoryExtractionContext, MemoryExtractor, MemoryType};
use prompt::ChatMessage;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use dialogue_core::ConversationTurn;

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract long-term memories about the user from conversations.

Memory types:
- EXPERIENTIAL: things the user did, went through or felt (events, experiences).
- FACTUAL: stable facts about the user (preferences, relationships, job, habits).

Rules:
- Only extract information worth remembering across future conversations.
- Skip anything already covered by the existing memories.
- importance is a number between 0.0 and 1.0.

Reply with a JSON array only, no prose:
[{"type": "EXPERIENTIAL" | "FACTUAL", "content": "...", "importance": 0.0, "reasoning": "..."}]
Reply with [] when there is nothing new."#;

#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(rename = "type")]
    memory_type: String,
    content: String,
    importance: f64,
    #[serde(default)]
    reasoning: String,
}

pub struct LlmMemoryExtractor {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl LlmMemoryExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }
}

/// User prompt: recent conversations, then existing memories.
pub fn build_user_prompt(turns: &[ConversationTurn], existing: &[Memory]) -> String {
    let mut out = String::from("Recent Conversations:\n");
    for turn in turns {
        out.push_str("User: ");
        out.push_str(&turn.query);
        out.push('\n');
        if let Some(response) = &turn.response {
            out.push_str("Assistant: ");
            out.push_str(response);
            out.push('\n');
        }
    }

    if !existing.is_empty() {
        out.push_str("\nExisting Memories (for deduplication):\n");
        for memory in existing {
            out.push_str(&format!(
                "- [{}, importance: {:.2}] {}\n",
                memory.memory_type, memory.importance, memory.content
            ));
        }
    }
    out
}

/// Removes a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses the model reply. Unparseable replies yield no candidates; invalid entries are skipped.
pub fn parse_candidates(reply: &str) -> Vec<ExtractedMemory> {
    let raw: Vec<RawCandidate> = match serde_json::from_str(strip_code_fence(reply)) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Memory extraction reply is not a JSON array; ignoring");
            return Vec::new();
        }
    };

    raw.into_iter()
        .filter_map(|c| {
            let memory_type = match c.memory_type.parse::<MemoryType>() {
                Ok(t) => t,
                Err(e) => {
                    debug!(error = %e, "Skipping extracted memory");
                    return None;
                }
            };
            ExtractedMemory::new(memory_type, c.content, c.importance, c.reasoning)
                .map_err(|e| debug!(error = %e, "Skipping extracted memory"))
                .ok()
        })
        .collect()
}

#[async_trait]
impl MemoryExtractor for LlmMemoryExtractor {
    #[instrument(skip(self, context), fields(model = %self.model))]
    async fn extract_memories(
        &self,
        context: &MemoryExtractionContext,
    ) -> Result<Vec<ExtractedMemory>, anyhow::Error> {
        let messages = vec![
            ChatMessage::system(EXTRACTION_SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(
                &context.recent_turns,
                &context.existing_memories,
            )),
        ];

        let reply = self.llm.complete(messages, &self.model).await?;
        let candidates = parse_candidates(&reply);
        info!(candidates = candidates.len(), "step: LLM memory extraction parsed");
        Ok(candidates)
    }
}
