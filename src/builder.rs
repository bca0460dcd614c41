//! Cache Construction
//!
//! [`SemanticCacheBuilder`] collects the pieces a [`SemanticCache`] needs
//! (a backend, an embedding provider, a similarity comparator, and the
//! chunking policy) and validates the combination when [`build`] is called.
//!
//! [`build`]: SemanticCacheBuilder::build
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use recall::{MockConfig, MockProvider, SemanticCacheBuilder, Similarity};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> recall::Result<()> {
//! let cache = SemanticCacheBuilder::<String, String>::new()
//!     .lru_backend(1000)
//!     .provider(Arc::new(MockProvider::new(MockConfig::new(384))))
//!     .comparator(Similarity::Cosine)
//!     .build()
//!     .await?;
//! # let _ = cache;
//! # Ok(())
//! # }
//! ```

use crate::backends::{CacheBackend, FifoBackend, LfuBackend, LruBackend};
#[cfg(feature = "remote")]
use crate::backends::{RedisBackend, RedisBackendConfig};
use crate::cache::SemanticCache;
use crate::chunker::{ChunkConfig, FixedOverlapChunker};
use crate::error::{RecallError, Result};
use crate::providers::EmbeddingProvider;
use crate::similarity::{Comparator, Similarity};
use crate::tokenizer::{Tokenizer, WhitespaceTokenizer};
use futures::future::BoxFuture;
use std::hash::Hash;
use std::sync::Arc;
use tracing::warn;

/// Deferred backend constructor, used for backends whose creation is async
/// (the remote backend connects during `build`).
type BackendFactory<K, V> =
    Box<dyn FnOnce() -> BoxFuture<'static, Result<Arc<dyn CacheBackend<K, V>>>> + Send>;

enum BackendChoice<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    Lru(usize),
    Lfu(usize),
    Fifo(usize),
    Custom(Arc<dyn CacheBackend<K, V>>),
    Deferred(BackendFactory<K, V>),
}

/// Builder for [`SemanticCache`].
///
/// Defaults: cosine comparator, chunking enabled with a 512-token chunk
/// size, 50-token overlap, and the max-tokens threshold taken from the
/// provider. A backend and a provider are required.
pub struct SemanticCacheBuilder<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    backend: Option<BackendChoice<K, V>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    comparator: Comparator,
    chunking: bool,
    chunk_config: ChunkConfig,
    tokenizer: Arc<dyn Tokenizer>,
}

impl<K, V> Default for SemanticCacheBuilder<K, V>
where
    K: Clone + Eq + Hash + Default + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SemanticCacheBuilder<K, V>
where
    K: Clone + Eq + Hash + Default + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a builder with defaults
    pub fn new() -> Self {
        Self {
            backend: None,
            provider: None,
            comparator: Similarity::Cosine.comparator(),
            chunking: true,
            // max_tokens 0 = fill in from the provider at build time
            chunk_config: ChunkConfig {
                max_tokens: 0,
                ..ChunkConfig::default()
            },
            tokenizer: Arc::new(WhitespaceTokenizer::new()),
        }
    }

    /// Use an in-memory LRU backend; capacity 0 means unbounded
    pub fn lru_backend(mut self, capacity: usize) -> Self {
        self.backend = Some(BackendChoice::Lru(capacity));
        self
    }

    /// Use an in-memory LFU backend; capacity 0 means unbounded
    pub fn lfu_backend(mut self, capacity: usize) -> Self {
        self.backend = Some(BackendChoice::Lfu(capacity));
        self
    }

    /// Use an in-memory FIFO backend; capacity 0 means unbounded
    pub fn fifo_backend(mut self, capacity: usize) -> Self {
        self.backend = Some(BackendChoice::Fifo(capacity));
        self
    }

    /// Use a pre-configured backend
    pub fn backend(mut self, backend: Arc<dyn CacheBackend<K, V>>) -> Self {
        self.backend = Some(BackendChoice::Custom(backend));
        self
    }

    /// Use a pre-configured embedding provider
    pub fn provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Select one of the built-in similarity kernels
    pub fn comparator(mut self, similarity: Similarity) -> Self {
        self.comparator = similarity.comparator();
        self
    }

    /// Supply a custom similarity function
    pub fn comparator_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&[f32], &[f32]) -> f32 + Send + Sync + 'static,
    {
        self.comparator = Arc::new(f);
        self
    }

    /// Enable or disable chunking of overlong inputs (enabled by default)
    pub fn chunking(mut self, enabled: bool) -> Self {
        self.chunking = enabled;
        self
    }

    /// Set the chunking configuration
    pub fn chunk_config(mut self, config: ChunkConfig) -> Self {
        self.chunk_config = config;
        self
    }

    /// Set the tokenizer used for chunking decisions
    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Validate the configuration and construct the cache.
    ///
    /// Fails when no backend or no provider was configured, or when a remote
    /// backend cannot connect. A chunker that fails to construct disables
    /// chunking rather than failing the build.
    pub async fn build(self) -> Result<SemanticCache<K, V>> {
        let backend: Arc<dyn CacheBackend<K, V>> = match self.backend {
            Some(BackendChoice::Lru(capacity)) => Arc::new(LruBackend::new(capacity)),
            Some(BackendChoice::Lfu(capacity)) => Arc::new(LfuBackend::new(capacity)),
            Some(BackendChoice::Fifo(capacity)) => Arc::new(FifoBackend::new(capacity)),
            Some(BackendChoice::Custom(backend)) => backend,
            Some(BackendChoice::Deferred(factory)) => factory().await?,
            None => return Err(RecallError::MissingBackend),
        };

        let provider = self.provider.ok_or(RecallError::MissingProvider)?;

        let chunker = if self.chunking {
            let mut config = self.chunk_config;
            if config.max_tokens == 0 {
                config.max_tokens = provider.max_tokens();
            }
            match FixedOverlapChunker::new(config, self.tokenizer) {
                Ok(chunker) => Some(chunker),
                Err(e) => {
                    // Chunking is an optimization; a bad chunk config
                    // degrades to whole-input embedding.
                    warn!("chunking disabled: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(SemanticCache::from_parts(
            backend,
            provider,
            self.comparator,
            chunker,
        ))
    }
}

#[cfg(feature = "remote")]
impl<K, V> SemanticCacheBuilder<K, V>
where
    K: std::fmt::Display
        + std::str::FromStr
        + Clone
        + Eq
        + Hash
        + Default
        + Send
        + Sync
        + 'static,
    V: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Use a Redis backend; the connection is established during
    /// [`build`](Self::build).
    ///
    /// Requires `K` to render to a string (and parse back) and `V` to be
    /// serializable, since entries travel as JSON documents.
    pub fn remote_backend(mut self, config: RedisBackendConfig) -> Self {
        self.backend = Some(BackendChoice::Deferred(Box::new(move || {
            Box::pin(async move {
                let backend: Arc<dyn CacheBackend<K, V>> =
                    Arc::new(RedisBackend::new(config).await?);
                Ok(backend)
            })
        })));
        self
    }
}
