//! # OpenAI embeddings
//!
//! [`EmbeddingService`] over the OpenAI embeddings API or a compatible server. Memory retrieval
//! embeds each query; extraction embeds each new memory. Requests are bounded by a 30s timeout.

use async_openai::{types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use embedding::{EmbeddingConfig, EmbeddingService};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const EMBED_TIMEOUT: Duration = Duration::from_secs(30);
const LOG_PREVIEW_LEN: usize = 120;

#[derive(Debug, Clone)]
pub struct OpenAIEmbedding {
    client: Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAIEmbedding {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_base_url(api_key, model, None)
    }

    /// When `base_url` is `Some`, requests are sent to that URL instead of the default OpenAI API.
    pub fn new_with_base_url(api_key: String, model: String, base_url: Option<&str>) -> Self {
        let mut openai_config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url.filter(|s| !s.is_empty()) {
            openai_config = openai_config.with_api_base(url);
        }
        Self {
            client: Client::with_config(openai_config),
            model,
        }
    }

    pub fn from_config(config: &dyn EmbeddingConfig) -> Self {
        Self::new_with_base_url(
            config.api_key().to_string(),
            config.model().to_string(),
            config.base_url(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        let expected = inputs.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.clone())
            .input(inputs)
            .build()?;

        let response = tokio::time::timeout(EMBED_TIMEOUT, self.client.embeddings().create(request))
            .await
            .map_err(|_| {
                warn!(timeout_secs = EMBED_TIMEOUT.as_secs(), "OpenAI embeddings request timed out");
                anyhow::anyhow!(
                    "OpenAI embeddings request timed out after {}s",
                    EMBED_TIMEOUT.as_secs()
                )
            })?
            .map_err(|e| {
                warn!(error = %e, "OpenAI embeddings request failed");
                anyhow::Error::from(e)
            })?;

        // The API may answer out of order; `index` is authoritative.
        let mut data = response.data;
        data.sort_by_key(|item| item.index);
        let vectors: Vec<Vec<f32>> = data.into_iter().map(|item| item.embedding).collect();
        if vectors.len() != expected {
            anyhow::bail!("Expected {} embeddings, got {}", expected, vectors.len());
        }
        Ok(vectors)
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(LOG_PREVIEW_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl EmbeddingService for OpenAIEmbedding {
    #[instrument(skip(self, text), fields(model = %self.model, text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        debug!(text_preview = %preview(text), "step: embedding request");

        let mut vectors = self.request(vec![text.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("No embedding returned from OpenAI"))?;

        debug!(dimension = vector.len(), "step: embedding done");
        Ok(vector)
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(texts.to_vec()).await?;
        info!(
            count = vectors.len(),
            dimension = vectors.first().map(|v| v.len()).unwrap_or(0),
            "step: embedding batch done"
        );
        Ok(vectors)
    }
}
