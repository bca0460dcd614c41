//! Cache Backends
//!
//! Storage substrates for `(key -> (embedding, value))` pairs. Each backend
//! owns an **embedding index**, a `key -> embedding` map maintained in
//! lockstep with the value store, so similarity scans can read embeddings
//! without touching (or deserializing) the stored values.
//!
//! Three in-memory backends cover the common eviction disciplines:
//!
//! - [`LruBackend`]: least-recently-used; `get` and `set` refresh recency
//! - [`LfuBackend`]: least-frequently-used; `get` and replacing `set` bump
//!   the frequency, presence checks do not
//! - [`FifoBackend`]: insertion order; `get` never reorders
//!
//! With the `remote` feature, [`RedisBackend`] stores entries as JSON
//! documents in Redis under a configurable key prefix.
//!
//! # Locking
//!
//! Every in-memory backend holds a single `parking_lot::RwLock` guarding
//! both the value store and the embedding index, so eviction updates both
//! atomically: no reader ever observes a key in one but not the other.
//! Recency/frequency updates mutate backend state, so `get` takes the
//! writer lock on the LRU and LFU backends.

use crate::error::{RecallError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use tokio_util::sync::CancellationToken;

mod fifo;
mod lfu;
mod lru;
#[cfg(feature = "remote")]
mod redis;

pub use fifo::FifoBackend;
pub use lfu::LfuBackend;
pub use lru::LruBackend;
#[cfg(feature = "remote")]
pub use redis::{RedisBackend, RedisBackendConfig};

/// An embedding paired with its cached value.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<V> {
    /// Embedding vector for the text the value was stored under
    pub embedding: Vec<f32>,
    /// The cached value
    pub value: V,
}

impl<V> Entry<V> {
    /// Create an entry
    pub fn new(embedding: Vec<f32>, value: V) -> Self {
        Self { embedding, value }
    }
}

/// Storage backend for the semantic cache.
///
/// All methods take a [`CancellationToken`]: in-memory implementations check
/// it once on entry, remote implementations race every round trip against
/// it. Methods are natively async, so an I/O-bound backend can pipeline or
/// batch internally (see [`CacheBackend::get_batch`]), while in-memory
/// backends complete without suspending.
#[async_trait]
pub trait CacheBackend<K, V>: Send + Sync
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    /// Insert or replace the entry for `key`, updating the embedding index
    /// atomically with the value store
    async fn set(&self, ctx: &CancellationToken, key: K, entry: Entry<V>) -> Result<()>;

    /// Retrieve the entry for `key`
    async fn get(&self, ctx: &CancellationToken, key: &K) -> Result<Option<Entry<V>>>;

    /// Remove the entry for `key`; removing a missing key is not an error
    async fn delete(&self, ctx: &CancellationToken, key: &K) -> Result<()>;

    /// Check presence without affecting recency or frequency
    async fn contains(&self, ctx: &CancellationToken, key: &K) -> Result<bool>;

    /// All currently-live keys; never includes evicted or stale keys
    async fn keys(&self, ctx: &CancellationToken) -> Result<Vec<K>>;

    /// Fast-path embedding read, consistent with [`CacheBackend::get`]
    async fn get_embedding(&self, ctx: &CancellationToken, key: &K) -> Result<Option<Vec<f32>>>;

    /// Number of live entries
    async fn len(&self, ctx: &CancellationToken) -> Result<usize>;

    /// Remove all entries and reset the embedding index
    async fn flush(&self, ctx: &CancellationToken) -> Result<()>;

    /// Retrieve several entries; only found keys appear in the result.
    ///
    /// The default implementation loops over [`CacheBackend::get`], skipping
    /// per-key failures. I/O-bound backends override this to pipeline.
    async fn get_batch(
        &self,
        ctx: &CancellationToken,
        keys: &[K],
    ) -> Result<HashMap<K, Entry<V>>> {
        let mut entries = HashMap::new();
        for key in keys {
            if let Ok(Some(entry)) = self.get(ctx, key).await {
                entries.insert(key.clone(), entry);
            }
        }
        Ok(entries)
    }

    /// Release backend resources
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Bail out early when the operation's token has been cancelled.
pub(crate) fn ensure_live(ctx: &CancellationToken) -> Result<()> {
    if ctx.is_cancelled() {
        return Err(RecallError::Cancelled);
    }
    Ok(())
}
