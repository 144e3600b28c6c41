//! Application configuration: dialogue settings plus every adapter's env config.

use anyhow::{Context, Result};
use embedding::EnvEmbeddingConfig;
use llm_client::EnvLlmConfig;
use memory::MemoryConfig;
use std::env;
use std::str::FromStr;
use tts::TtsConfig;

/// Settings owned by the dialogue application itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueConfig {
    pub database_url: String,
    pub log_file: String,
    /// Memories retrieved per request.
    pub memory_top_k: usize,
    /// Earlier turns retrieved as reference documents per request.
    pub retrieval_top_k: usize,
    /// Recent turns loaded as chat history.
    pub history_limit: usize,
    /// Sentences synthesized at the same time within one request.
    pub synthesis_concurrency: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:dialogue.db".to_string(),
            log_file: "logs/dialogue.log".to_string(),
            memory_top_k: 5,
            retrieval_top_k: 3,
            history_limit: 10,
            synthesis_concurrency: 3,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {}", key, raw)),
        _ => Ok(default),
    }
}

impl DialogueConfig {
    /// Load from environment variables; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            log_file: env::var("LOG_FILE").unwrap_or(defaults.log_file),
            memory_top_k: parse_var("DIALOGUE_MEMORY_TOP_K", defaults.memory_top_k)?,
            retrieval_top_k: parse_var("DIALOGUE_RETRIEVAL_TOP_K", defaults.retrieval_top_k)?,
            history_limit: parse_var("DIALOGUE_HISTORY_LIMIT", defaults.history_limit)?,
            synthesis_concurrency: parse_var(
                "DIALOGUE_SYNTHESIS_CONCURRENCY",
                defaults.synthesis_concurrency,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL must not be empty");
        }
        if self.synthesis_concurrency == 0 {
            anyhow::bail!("DIALOGUE_SYNTHESIS_CONCURRENCY must be at least 1");
        }
        Ok(())
    }
}

/// Everything the binary needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dialogue: DialogueConfig,
    pub llm: EnvLlmConfig,
    pub embedding: EnvEmbeddingConfig,
    pub memory: MemoryConfig,
    pub tts: TtsConfig,
}

impl AppConfig {
    /// Loads every section from the environment. Command-line values override
    /// `DATABASE_URL` and `LOG_FILE`.
    pub fn load(database_url: Option<String>, log_file: Option<String>) -> Result<Self> {
        let mut dialogue = DialogueConfig::from_env()?;
        if let Some(url) = database_url {
            dialogue.database_url = url;
        }
        if let Some(path) = log_file {
            dialogue.log_file = path;
        }
        dialogue.validate()?;

        let llm = EnvLlmConfig::from_env()?;
        llm.validate()?;
        let embedding = EnvEmbeddingConfig::from_env()?;
        embedding.validate()?;
        let memory = MemoryConfig::from_env()?;
        let tts = TtsConfig::from_env().context("Invalid TTS configuration")?;

        Ok(Self {
            dialogue,
            llm,
            embedding,
            memory,
            tts,
        })
    }
}
