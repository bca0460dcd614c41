//! Deterministic mock provider for tests and local development.

use crate::error::Result;
use crate::providers::{BatchEmbeddingProvider, EmbeddingProvider};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Mock provider configuration
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Embedding dimensionality
    pub dimensions: usize,
    /// Simulated per-call latency
    pub latency: Duration,
    /// Normalize embeddings to unit length
    pub normalize: bool,
    /// Seed mixed into every hash, so two providers can disagree
    pub seed: u64,
    /// Token ceiling reported to the cache
    pub max_tokens: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimensions: 384,
            latency: Duration::ZERO,
            normalize: true,
            seed: 42,
            max_tokens: 8191,
        }
    }
}

impl MockConfig {
    /// Configuration with the given dimensionality and defaults otherwise
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            ..Default::default()
        }
    }
}

/// Deterministic embedding provider for testing.
///
/// Embeddings are derived from a hash of the input text, so the same text
/// always maps to the same vector within a seed. Call counts are tracked so
/// tests can assert how often the provider was actually hit.
pub struct MockProvider {
    config: MockConfig,
    embed_calls: AtomicU64,
    batch_calls: AtomicU64,
}

impl MockProvider {
    /// Create a mock provider
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            embed_calls: AtomicU64::new(0),
            batch_calls: AtomicU64::new(0),
        }
    }

    /// Number of `embed_text` calls made so far
    pub fn embed_calls(&self) -> u64 {
        self.embed_calls.load(Ordering::Relaxed)
    }

    /// Number of `embed_batch` calls made so far
    pub fn batch_calls(&self) -> u64 {
        self.batch_calls.load(Ordering::Relaxed)
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish().wrapping_add(self.config.seed);

        let mut embedding = Vec::with_capacity(self.config.dimensions);
        for _ in 0..self.config.dimensions {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            embedding.push(((state >> 33) as f32) / (u32::MAX as f32) * 2.0 - 1.0);
        }

        if self.config.normalize {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                embedding.iter_mut().for_each(|v| *v /= norm);
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::Relaxed);
        if self.config.latency > Duration::ZERO {
            tokio::time::sleep(self.config.latency).await;
        }
        Ok(self.generate(text))
    }

    fn max_tokens(&self) -> usize {
        self.config.max_tokens
    }

    fn as_batch(&self) -> Option<&dyn BatchEmbeddingProvider> {
        Some(self)
    }
}

#[async_trait]
impl BatchEmbeddingProvider for MockProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        if self.config.latency > Duration::ZERO {
            tokio::time::sleep(self.config.latency).await;
        }
        Ok(texts.iter().map(|t| self.generate(t)).collect())
    }
}
