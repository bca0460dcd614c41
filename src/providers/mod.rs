//! Embedding Providers
//!
//! Abstraction layer over embedding model providers. The cache only ever
//! talks to the [`EmbeddingProvider`] trait; concrete implementations ship
//! for OpenAI ([`OpenAiProvider`]) and deterministic testing
//! ([`MockProvider`]).
//!
//! Batching is a *refinement*: providers that can embed many texts in one
//! round trip also implement [`BatchEmbeddingProvider`] and advertise it via
//! [`EmbeddingProvider::as_batch`]. The cache probes that capability when it
//! has several chunks to embed and falls back to per-text calls otherwise.
//!
//! Provider calls are treated as network-bound: the cache never invokes them
//! while holding a backend lock.

use crate::error::Result;
use async_trait::async_trait;

mod mock;
mod openai;

pub use mock::{MockConfig, MockProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};

/// Turns text into a fixed-dimension embedding vector.
///
/// The dimension is stable for the provider's lifetime: every vector an
/// instance returns has the same length.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single piece of non-empty text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// The input ceiling, in tokens, above which the provider may reject
    /// text. The cache chunks inputs that exceed this limit.
    fn max_tokens(&self) -> usize;

    /// Probe for the optional batch capability
    fn as_batch(&self) -> Option<&dyn BatchEmbeddingProvider> {
        None
    }

    /// Release any resources held by the provider
    fn close(&self) {}
}

/// Optional batch refinement of [`EmbeddingProvider`].
///
/// `embed_batch` returns one vector per input text, in input order, or fails
/// as a whole; there is no partial success. Implementations may cap the
/// batch size and reject larger requests with
/// [`RecallError::BatchTooLarge`](crate::error::RecallError::BatchTooLarge).
#[async_trait]
pub trait BatchEmbeddingProvider: EmbeddingProvider {
    /// Embed several texts in one request
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
