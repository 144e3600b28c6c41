//! Memory configuration loaded from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Tunables for retrieval and extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryConfig {
    /// Model used by [`crate::LlmMemoryExtractor`].
    pub extraction_model: String,
    /// Extraction runs when the completed-turn count is a positive multiple of this.
    pub conversation_threshold: u64,
    /// Importance added to every retrieved memory (capped at 1.0).
    pub importance_boost: f64,
    /// Minimum importance for a memory to be a search candidate.
    pub importance_threshold: f64,
    /// Decay rate per day since last access.
    pub recency_weight: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            extraction_model: "gpt-4o-mini".to_string(),
            conversation_threshold: 5,
            importance_boost: 0.05,
            importance_threshold: 0.3,
            recency_weight: 0.1,
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

impl MemoryConfig {
    /// Load from environment variables; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            extraction_model: env::var("MEMORY_EXTRACTION_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.extraction_model),
            conversation_threshold: parse_var(
                "MEMORY_CONVERSATION_THRESHOLD",
                defaults.conversation_threshold,
            )?,
            importance_boost: parse_var("MEMORY_IMPORTANCE_BOOST", defaults.importance_boost)?,
            importance_threshold: parse_var(
                "MEMORY_IMPORTANCE_THRESHOLD",
                defaults.importance_threshold,
            )?,
            recency_weight: parse_var("MEMORY_RECENCY_WEIGHT", defaults.recency_weight)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.conversation_threshold == 0 {
            anyhow::bail!("MEMORY_CONVERSATION_THRESHOLD must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.importance_boost) {
            anyhow::bail!("MEMORY_IMPORTANCE_BOOST must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.importance_threshold) {
            anyhow::bail!("MEMORY_IMPORTANCE_THRESHOLD must be within [0, 1]");
        }
        if !self.recency_weight.is_finite() || self.recency_weight < 0.0 {
            anyhow::bail!("MEMORY_RECENCY_WEIGHT must be a non-negative number");
        }
        Ok(())
    }
}
