//! OpenAI embedding provider backed by the embeddings REST endpoint.

use crate::error::{RecallError, Result};
use crate::providers::{BatchEmbeddingProvider, EmbeddingProvider};
use async_trait::async_trait;
use std::time::Duration;

/// Default embedding model
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Input token ceiling shared by OpenAI's embedding models
/// (text-embedding-3-small, text-embedding-3-large, text-embedding-ada-002).
/// Unknown models get the same conservative limit.
const OPENAI_MAX_TOKENS: usize = 8191;

/// OpenAI accepts at most this many inputs per embeddings request
const OPENAI_BATCH_LIMIT: usize = 2048;

/// OpenAI provider configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key; falls back to the `OPENAI_API_KEY` environment variable
    pub api_key: String,
    /// Embedding model name
    pub model: String,
    /// API base URL, overridable for proxies and compatible servers
    pub base_url: String,
    /// Organization header, if the account requires one
    pub organization: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Requested output dimensions (supported by the v3 models)
    pub dimensions: Option<usize>,
}

impl OpenAiConfig {
    /// Create a configuration with the given API key and defaults
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            organization: None,
            timeout: Duration::from_secs(30),
            dimensions: None,
        }
    }

    /// Read the API key from `OPENAI_API_KEY`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| RecallError::Embedding("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the embedding model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the organization header
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Request reduced output dimensions
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = Some(dims);
        self
    }
}

/// Embedding provider backed by OpenAI's embeddings API
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a provider from the given configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(RecallError::Embedding("OpenAI API key is required".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RecallError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Create a provider with the key taken from `OPENAI_API_KEY`
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    async fn request_embeddings(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "input": inputs,
        });
        if let Some(dims) = self.config.dimensions {
            body["dimensions"] = serde_json::json!(dims);
        }

        let mut request = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body);
        if let Some(org) = &self.config.organization {
            request = request.header("OpenAI-Organization", org.clone());
        }

        let resp = request
            .send()
            .await
            .map_err(|e| RecallError::Connection(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RecallError::Embedding(format!(
                "OpenAI returned {status}: {message}"
            )));
        }

        let result: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RecallError::Embedding(e.to_string()))?;

        let data = result["data"]
            .as_array()
            .ok_or(RecallError::EmptyEmbedding)?;
        if data.len() != inputs.len() {
            return Err(RecallError::Embedding(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                data.len()
            )));
        }

        data.iter()
            .map(|item| {
                item["embedding"]
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|v| v.as_f64().map(|f| f as f32))
                            .collect()
                    })
                    .ok_or(RecallError::EmptyEmbedding)
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.request_embeddings(&[text.to_string()]).await?;
        embeddings.into_iter().next().ok_or(RecallError::EmptyEmbedding)
    }

    fn max_tokens(&self) -> usize {
        OPENAI_MAX_TOKENS
    }

    fn as_batch(&self) -> Option<&dyn BatchEmbeddingProvider> {
        Some(self)
    }
}

#[async_trait]
impl BatchEmbeddingProvider for OpenAiProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(RecallError::Embedding(
                "no texts provided for batch embedding".into(),
            ));
        }
        if texts.len() > OPENAI_BATCH_LIMIT {
            return Err(RecallError::BatchTooLarge {
                size: texts.len(),
                max: OPENAI_BATCH_LIMIT,
            });
        }
        self.request_embeddings(texts).await
    }
}
