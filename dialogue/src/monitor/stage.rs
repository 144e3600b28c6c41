use serde::Serialize;

/// Named phases of one request, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    QueryPersistence,
    MemoryRetrieval,
    Retrieval,
    PromptBuilding,
    LlmCompletion,
    SentenceAssembly,
    TtsPreparation,
    TtsSynthesis,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::QueryPersistence => "QUERY_PERSISTENCE",
            PipelineStage::MemoryRetrieval => "MEMORY_RETRIEVAL",
            PipelineStage::Retrieval => "RETRIEVAL",
            PipelineStage::PromptBuilding => "PROMPT_BUILDING",
            PipelineStage::LlmCompletion => "LLM_COMPLETION",
            PipelineStage::SentenceAssembly => "SENTENCE_ASSEMBLY",
            PipelineStage::TtsPreparation => "TTS_PREPARATION",
            PipelineStage::TtsSynthesis => "TTS_SYNTHESIS",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl StageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageStatus::Completed | StageStatus::Failed | StageStatus::Cancelled
        )
    }
}

/// How a whole request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Completed,
    Failed,
    Cancelled,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Completed => "COMPLETED",
            PipelineStatus::Failed => "FAILED",
            PipelineStatus::Cancelled => "CANCELLED",
        }
    }
}
