//! Embedding configuration: trait and env-based implementation.

use anyhow::Result;
use std::env;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Embedding service configuration interface.
pub trait EmbeddingConfig: Send + Sync {
    fn model(&self) -> &str;
    /// API key for the OpenAI-compatible embedding endpoint.
    fn api_key(&self) -> &str;
    /// Optional base URL; `None` means the provider default.
    fn base_url(&self) -> Option<&str>;
}

/// Embedding config loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvEmbeddingConfig {
    pub embedding_model: String,
    pub embedding_api_key: String,
    pub embedding_base_url: Option<String>,
}

impl EmbeddingConfig for EnvEmbeddingConfig {
    fn model(&self) -> &str {
        &self.embedding_model
    }
    fn api_key(&self) -> &str {
        &self.embedding_api_key
    }
    fn base_url(&self) -> Option<&str> {
        self.embedding_base_url.as_deref().filter(|s| !s.is_empty())
    }
}

impl EnvEmbeddingConfig {
    /// Load from environment variables. `EMBEDDING_API_KEY` falls back to `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let embedding_model = env::var("EMBEDDING_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
        let embedding_api_key = env::var("EMBEDDING_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .unwrap_or_default();
        let embedding_base_url = env::var("EMBEDDING_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        Ok(Self {
            embedding_model,
            embedding_api_key,
            embedding_base_url,
        })
    }

    /// Validate config: an API key is required.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_api_key.trim().is_empty() {
            anyhow::bail!("EMBEDDING_API_KEY or OPENAI_API_KEY must be set for embeddings");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        for key in [
            "EMBEDDING_MODEL",
            "EMBEDDING_API_KEY",
            "EMBEDDING_BASE_URL",
            "OPENAI_API_KEY",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn api_key_falls_back_to_openai_key() {
        clear();
        env::set_var("OPENAI_API_KEY", "sk-openai");

        let config = EnvEmbeddingConfig::from_env().unwrap();
        assert_eq!(config.api_key(), "sk-openai");
        assert_eq!(config.model(), DEFAULT_EMBEDDING_MODEL);
        assert!(config.base_url().is_none());
        assert!(config.validate().is_ok());

        env::set_var("EMBEDDING_API_KEY", "sk-embed");
        let config = EnvEmbeddingConfig::from_env().unwrap();
        assert_eq!(config.api_key(), "sk-embed");

        clear();
    }

    #[test]
    #[serial]
    fn validate_rejects_missing_key() {
        clear();
        let config = EnvEmbeddingConfig::from_env().unwrap();
        assert!(config.validate().is_err());
    }
}
