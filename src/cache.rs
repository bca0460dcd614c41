//! Semantic Cache Core
//!
//! [`SemanticCache`] ties an embedding provider, a cache backend, and a
//! similarity comparator together. Exact-key reads behave like any key/value
//! cache; [`lookup`] and [`top_matches`] search by meaning instead, scoring
//! the query text's embedding against every stored entry.
//!
//! Inputs longer than the provider's token ceiling are split into
//! overlapping chunks, embedded (in one batch when the provider supports
//! it), and stored under the original key as the component-wise mean of the
//! chunk embeddings: one key, one vector, regardless of input length.
//!
//! [`lookup`]: SemanticCache::lookup
//! [`top_matches`]: SemanticCache::top_matches
//!
//! # Concurrency
//!
//! A `SemanticCache` is cheap to clone and safe to share: clones refer to
//! the same backend and provider. Every operation takes a
//! [`CancellationToken`]; provider and remote-backend calls race against it,
//! and they always happen outside any backend lock. The `*_async` variants
//! spawn the work onto the runtime and hand back a one-shot receiver, so a
//! caller that never reads the result does not leak the worker.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use recall::{MockConfig, MockProvider, SemanticCacheBuilder};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> recall::Result<()> {
//! let cache = SemanticCacheBuilder::<String, String>::new()
//!     .lru_backend(1000)
//!     .provider(Arc::new(MockProvider::new(MockConfig::new(64))))
//!     .build()
//!     .await?;
//!
//! let ctx = CancellationToken::new();
//! cache.set(&ctx, "greeting".into(), "hello world", "cached answer".into()).await?;
//!
//! if let Some(m) = cache.lookup(&ctx, "hello world", 0.9).await? {
//!     println!("hit: {} (score {})", m.value, m.score);
//! }
//! # Ok(())
//! # }
//! ```

use crate::backends::{CacheBackend, Entry};
use crate::chunker::{Chunk, FixedOverlapChunker};
use crate::error::{RecallError, Result};
use crate::providers::EmbeddingProvider;
use crate::similarity::Comparator;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A semantic search result with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<V> {
    /// The cached value
    pub value: V,
    /// Score assigned by the active comparator
    pub score: f32,
}

/// One item of a batch `set`.
#[derive(Debug, Clone)]
pub struct BatchItem<K, V> {
    /// Cache key
    pub key: K,
    /// Text to embed
    pub input_text: String,
    /// Value to store
    pub value: V,
}

struct CacheInner<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    backend: Arc<dyn CacheBackend<K, V>>,
    provider: Arc<dyn EmbeddingProvider>,
    comparator: Comparator,
    chunker: Option<FixedOverlapChunker>,
}

/// Semantic key/value cache with pluggable backend, provider, and
/// similarity kernel. Construct one with [`SemanticCacheBuilder`].
///
/// [`SemanticCacheBuilder`]: crate::SemanticCacheBuilder
pub struct SemanticCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    inner: Arc<CacheInner<K, V>>,
}

impl<K, V> Clone for SemanticCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> SemanticCache<K, V>
where
    K: Clone + Eq + Hash + Default + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn from_parts(
        backend: Arc<dyn CacheBackend<K, V>>,
        provider: Arc<dyn EmbeddingProvider>,
        comparator: Comparator,
        chunker: Option<FixedOverlapChunker>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                backend,
                provider,
                comparator,
                chunker,
            }),
        }
    }

    /// Whether overlong inputs are chunked before embedding
    pub fn chunking_enabled(&self) -> bool {
        self.inner.chunker.is_some()
    }

    /// The token count above which chunking applies, if chunking is enabled
    pub fn chunk_threshold(&self) -> Option<usize> {
        self.inner.chunker.as_ref().map(|c| c.max_tokens())
    }

    // ------------------------------------------------------------------
    // Exact-key operations
    // ------------------------------------------------------------------

    /// Store or update the entry for `key`, embedding `input_text`.
    ///
    /// Rejects the zero value of `K`. When chunking is enabled and the text
    /// exceeds the token threshold, the chunk embeddings are averaged into a
    /// single vector stored against `key`; no per-chunk keys are created.
    pub async fn set(
        &self,
        ctx: &CancellationToken,
        key: K,
        input_text: &str,
        value: V,
    ) -> Result<()> {
        if key == K::default() {
            return Err(RecallError::ZeroKey);
        }
        let embedding = self.embed_for_storage(ctx, input_text).await?;
        self.inner
            .backend
            .set(ctx, key, Entry::new(embedding, value))
            .await
    }

    /// Retrieve the value for `key`, if present
    pub async fn get(&self, ctx: &CancellationToken, key: &K) -> Result<Option<V>> {
        Ok(self
            .inner
            .backend
            .get(ctx, key)
            .await?
            .map(|entry| entry.value))
    }

    /// Check for `key` without affecting recency or frequency
    pub async fn contains(&self, ctx: &CancellationToken, key: &K) -> Result<bool> {
        self.inner.backend.contains(ctx, key).await
    }

    /// Remove the entry for `key`; removing a missing key is not an error
    pub async fn delete(&self, ctx: &CancellationToken, key: &K) -> Result<()> {
        self.inner.backend.delete(ctx, key).await
    }

    /// Remove all entries
    pub async fn flush(&self, ctx: &CancellationToken) -> Result<()> {
        self.inner.backend.flush(ctx).await
    }

    /// Number of entries in the cache
    pub async fn len(&self, ctx: &CancellationToken) -> Result<usize> {
        self.inner.backend.len(ctx).await
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self, ctx: &CancellationToken) -> Result<bool> {
        Ok(self.len(ctx).await? == 0)
    }

    /// Release the provider and close the backend
    pub async fn close(&self) -> Result<()> {
        self.inner.provider.close();
        self.inner.backend.close().await
    }

    // ------------------------------------------------------------------
    // Similarity search
    // ------------------------------------------------------------------

    /// Return the best-scoring entry whose similarity to `input_text` is at
    /// least `threshold`, or `None` when nothing qualifies.
    ///
    /// The scan is a single pass: once an entry qualifies, the bar rises to
    /// its score, so later entries must match or beat it. Entries whose
    /// embedding or value cannot be read (racing an eviction, a corrupt
    /// document) are skipped rather than failing the search.
    pub async fn lookup(
        &self,
        ctx: &CancellationToken,
        input_text: &str,
        threshold: f32,
    ) -> Result<Option<Match<V>>> {
        let query = self.embed(ctx, input_text).await?;
        let keys = self.inner.backend.keys(ctx).await?;

        let mut best = None;
        let mut bar = threshold;
        for key in keys {
            if ctx.is_cancelled() {
                return Err(RecallError::Cancelled);
            }
            let Ok(Some(embedding)) = self.inner.backend.get_embedding(ctx, &key).await else {
                continue;
            };
            let score = (self.inner.comparator)(&query, &embedding);
            if score >= bar {
                if let Ok(Some(entry)) = self.inner.backend.get(ctx, &key).await {
                    best = Some(Match {
                        value: entry.value,
                        score,
                    });
                    bar = score;
                }
            }
        }
        Ok(best)
    }

    /// Return up to `n` entries ranked by descending similarity to
    /// `input_text`. No threshold is applied; `n` must be positive.
    pub async fn top_matches(
        &self,
        ctx: &CancellationToken,
        input_text: &str,
        n: usize,
    ) -> Result<Vec<Match<V>>> {
        if n == 0 {
            return Err(RecallError::InvalidTopN);
        }

        let query = self.embed(ctx, input_text).await?;
        let keys = self.inner.backend.keys(ctx).await?;

        let mut matches = Vec::with_capacity(keys.len());
        for key in keys {
            if ctx.is_cancelled() {
                return Err(RecallError::Cancelled);
            }
            let Ok(Some(embedding)) = self.inner.backend.get_embedding(ctx, &key).await else {
                continue;
            };
            let score = (self.inner.comparator)(&query, &embedding);
            if let Ok(Some(entry)) = self.inner.backend.get(ctx, &key).await {
                matches.push(Match {
                    value: entry.value,
                    score,
                });
            }
        }

        matches.sort_by_key(|m| Reverse(OrderedFloat(m.score)));
        matches.truncate(n);
        Ok(matches)
    }

    // ------------------------------------------------------------------
    // Batch operations
    // ------------------------------------------------------------------

    /// Store several entries, serially and fail-fast: the first failing item
    /// aborts the batch, leaving already-written entries in place.
    pub async fn set_batch(
        &self,
        ctx: &CancellationToken,
        items: Vec<BatchItem<K, V>>,
    ) -> Result<()> {
        for item in items {
            self.set(ctx, item.key, &item.input_text, item.value).await?;
        }
        Ok(())
    }

    /// Retrieve several values; only found keys appear in the result
    pub async fn get_batch(
        &self,
        ctx: &CancellationToken,
        keys: &[K],
    ) -> Result<HashMap<K, V>> {
        let mut values = HashMap::new();
        for key in keys {
            if let Some(value) = self.get(ctx, key).await? {
                values.insert(key.clone(), value);
            }
        }
        Ok(values)
    }

    /// Remove several entries, fail-fast
    pub async fn delete_batch(&self, ctx: &CancellationToken, keys: &[K]) -> Result<()> {
        for key in keys {
            self.delete(ctx, key).await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Async variants
    // ------------------------------------------------------------------

    /// [`set`](Self::set), spawned onto the runtime. The receiver delivers
    /// the outcome exactly once; dropping it does not cancel the write.
    pub fn set_async(
        &self,
        ctx: &CancellationToken,
        key: K,
        input_text: impl Into<String>,
        value: V,
    ) -> oneshot::Receiver<Result<()>> {
        let cache = self.clone();
        let ctx = ctx.clone();
        let text = input_text.into();
        spawn_delivering(async move { cache.set(&ctx, key, &text, value).await })
    }

    /// [`get`](Self::get), spawned onto the runtime
    pub fn get_async(
        &self,
        ctx: &CancellationToken,
        key: K,
    ) -> oneshot::Receiver<Result<Option<V>>> {
        let cache = self.clone();
        let ctx = ctx.clone();
        spawn_delivering(async move { cache.get(&ctx, &key).await })
    }

    /// [`delete`](Self::delete), spawned onto the runtime
    pub fn delete_async(
        &self,
        ctx: &CancellationToken,
        key: K,
    ) -> oneshot::Receiver<Result<()>> {
        let cache = self.clone();
        let ctx = ctx.clone();
        spawn_delivering(async move { cache.delete(&ctx, &key).await })
    }

    /// [`contains`](Self::contains), spawned onto the runtime
    pub fn contains_async(
        &self,
        ctx: &CancellationToken,
        key: K,
    ) -> oneshot::Receiver<Result<bool>> {
        let cache = self.clone();
        let ctx = ctx.clone();
        spawn_delivering(async move { cache.contains(&ctx, &key).await })
    }

    /// [`flush`](Self::flush), spawned onto the runtime
    pub fn flush_async(&self, ctx: &CancellationToken) -> oneshot::Receiver<Result<()>> {
        let cache = self.clone();
        let ctx = ctx.clone();
        spawn_delivering(async move { cache.flush(&ctx).await })
    }

    /// [`len`](Self::len), spawned onto the runtime
    pub fn len_async(&self, ctx: &CancellationToken) -> oneshot::Receiver<Result<usize>> {
        let cache = self.clone();
        let ctx = ctx.clone();
        spawn_delivering(async move { cache.len(&ctx).await })
    }

    /// [`lookup`](Self::lookup), spawned onto the runtime
    pub fn lookup_async(
        &self,
        ctx: &CancellationToken,
        input_text: impl Into<String>,
        threshold: f32,
    ) -> oneshot::Receiver<Result<Option<Match<V>>>> {
        let cache = self.clone();
        let ctx = ctx.clone();
        let text = input_text.into();
        spawn_delivering(async move { cache.lookup(&ctx, &text, threshold).await })
    }

    /// [`top_matches`](Self::top_matches), spawned onto the runtime
    pub fn top_matches_async(
        &self,
        ctx: &CancellationToken,
        input_text: impl Into<String>,
        n: usize,
    ) -> oneshot::Receiver<Result<Vec<Match<V>>>> {
        let cache = self.clone();
        let ctx = ctx.clone();
        let text = input_text.into();
        spawn_delivering(async move { cache.top_matches(&ctx, &text, n).await })
    }

    /// Store several entries concurrently: every item gets its own task for
    /// embedding and writing. Waits for all of them, then reports the first
    /// error if any; entries written by the other tasks remain.
    pub fn set_batch_async(
        &self,
        ctx: &CancellationToken,
        items: Vec<BatchItem<K, V>>,
    ) -> oneshot::Receiver<Result<()>> {
        let cache = self.clone();
        let ctx = ctx.clone();
        spawn_delivering(async move {
            // Validate every key before spawning any work.
            if items.iter().any(|item| item.key == K::default()) {
                return Err(RecallError::ZeroKey);
            }

            let handles: Vec<_> = items
                .into_iter()
                .map(|item| {
                    let cache = cache.clone();
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        let embedding =
                            cache.embed_for_storage(&ctx, &item.input_text).await?;
                        cache
                            .inner
                            .backend
                            .set(&ctx, item.key, Entry::new(embedding, item.value))
                            .await
                    })
                })
                .collect();

            let mut first_error = None;
            for handle in handles {
                let result = handle
                    .await
                    .unwrap_or_else(|e| Err(RecallError::Backend(e.to_string())));
                if first_error.is_none() {
                    first_error = result.err();
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }

    /// Retrieve several values through the backend's batch path (which a
    /// remote backend may pipeline)
    pub fn get_batch_async(
        &self,
        ctx: &CancellationToken,
        keys: Vec<K>,
    ) -> oneshot::Receiver<Result<HashMap<K, V>>> {
        let cache = self.clone();
        let ctx = ctx.clone();
        spawn_delivering(async move {
            let entries = cache.inner.backend.get_batch(&ctx, &keys).await?;
            Ok(entries
                .into_iter()
                .map(|(key, entry)| (key, entry.value))
                .collect())
        })
    }

    /// Remove several entries concurrently; waits for all deletes and
    /// reports the first error if any
    pub fn delete_batch_async(
        &self,
        ctx: &CancellationToken,
        keys: Vec<K>,
    ) -> oneshot::Receiver<Result<()>> {
        let cache = self.clone();
        let ctx = ctx.clone();
        spawn_delivering(async move {
            let handles: Vec<_> = keys
                .into_iter()
                .map(|key| {
                    let cache = cache.clone();
                    let ctx = ctx.clone();
                    tokio::spawn(async move { cache.delete(&ctx, &key).await })
                })
                .collect();

            let mut first_error = None;
            for handle in handles {
                let result = handle
                    .await
                    .unwrap_or_else(|e| Err(RecallError::Backend(e.to_string())));
                if first_error.is_none() {
                    first_error = result.err();
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }

    // ------------------------------------------------------------------
    // Embedding helpers
    // ------------------------------------------------------------------

    /// Embed text, racing the provider call against cancellation.
    async fn embed(&self, ctx: &CancellationToken, text: &str) -> Result<Vec<f32>> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(RecallError::Cancelled),
            result = self.inner.provider.embed_text(text) => result,
        }
    }

    /// Produce the single vector stored for `text`: the text's own embedding
    /// when it fits, or the mean of its chunk embeddings when it does not.
    ///
    /// Tokenization or chunking hiccups degrade to whole-input embedding;
    /// the provider is the final arbiter of what it accepts.
    async fn embed_for_storage(&self, ctx: &CancellationToken, text: &str) -> Result<Vec<f32>> {
        if let Some(chunker) = &self.inner.chunker {
            if let Ok(count) = chunker.count_tokens(text) {
                if count > chunker.max_tokens() {
                    if let Ok(chunks) = chunker.chunk_text(text) {
                        if chunks.len() > 1 {
                            return self.embed_chunks(ctx, &chunks).await;
                        }
                    }
                }
            }
        }
        self.embed(ctx, text).await
    }

    async fn embed_chunks(&self, ctx: &CancellationToken, chunks: &[Chunk]) -> Result<Vec<f32>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        debug!(chunks = texts.len(), "embedding chunked input");

        let embeddings = match self.inner.provider.as_batch() {
            Some(batch) => {
                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Err(RecallError::Cancelled),
                    result = batch.embed_batch(&texts) => result?,
                }
            }
            None => {
                let mut embeddings = Vec::with_capacity(texts.len());
                for text in &texts {
                    embeddings.push(self.embed(ctx, text).await?);
                }
                embeddings
            }
        };

        if embeddings.is_empty() {
            return Err(RecallError::EmptyEmbedding);
        }
        Ok(aggregate_embeddings(&embeddings))
    }
}

/// Component-wise arithmetic mean of a set of embeddings.
fn aggregate_embeddings(embeddings: &[Vec<f32>]) -> Vec<f32> {
    if embeddings.len() == 1 {
        return embeddings[0].clone();
    }

    let dim = embeddings[0].len();
    let mut aggregate = vec![0.0f32; dim];
    for embedding in embeddings {
        for (acc, x) in aggregate.iter_mut().zip(embedding) {
            *acc += x;
        }
    }
    let count = embeddings.len() as f32;
    for x in &mut aggregate {
        *x /= count;
    }
    aggregate
}

/// Spawn `fut` and deliver its output through a buffered one-shot channel.
///
/// The channel buffers the single result, so the task completes and exits
/// even when the caller never reads the receiver.
fn spawn_delivering<T: Send + 'static>(
    fut: impl std::future::Future<Output = T> + Send + 'static,
) -> oneshot::Receiver<T> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = tx.send(fut.await);
    });
    rx
}
