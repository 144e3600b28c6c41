use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DialogueError {
    /// Short machine-friendly kind, recorded in tracker attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            DialogueError::Persistence(_) => "persistence",
            DialogueError::Llm(_) => "llm",
            DialogueError::Tts(_) => "tts",
            DialogueError::Config(_) => "config",
            DialogueError::Io(_) => "io",
            DialogueError::Unknown(_) => "unknown",
        }
    }
}

pub type Result<T> = std::result::Result<T, DialogueError>;
