//! Least-recently-used in-memory backend.

use crate::backends::{ensure_live, CacheBackend, Entry};
use crate::error::Result;
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// In-memory backend with LRU eviction.
///
/// `get` and `set` make the touched key most-recently-used; on overflow the
/// least-recently-used key is evicted, and its embedding index entry is
/// removed under the same writer lock.
pub struct LruBackend<K: Eq + Hash, V> {
    state: RwLock<LruState<K, V>>,
}

struct LruState<K: Eq + Hash, V> {
    entries: LruCache<K, Entry<V>>,
    index: HashMap<K, Vec<f32>>,
}

impl<K: Eq + Hash + Clone, V> LruBackend<K, V> {
    /// Create an LRU backend. A capacity of 0 disables eviction (unbounded).
    pub fn new(capacity: usize) -> Self {
        let entries = match NonZeroUsize::new(capacity) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            state: RwLock::new(LruState {
                entries,
                index: HashMap::new(),
            }),
        }
    }
}

#[async_trait]
impl<K, V> CacheBackend<K, V> for LruBackend<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn set(&self, ctx: &CancellationToken, key: K, entry: Entry<V>) -> Result<()> {
        ensure_live(ctx)?;
        let mut state = self.state.write();
        let embedding = entry.embedding.clone();
        // `push` reports the displaced pair: the old value when the key
        // already existed, or the evicted LRU entry on overflow. Dropping
        // the victim's index entry here keeps store and index in lockstep.
        if let Some((displaced, _)) = state.entries.push(key.clone(), entry) {
            if displaced != key {
                debug!("lru eviction");
                state.index.remove(&displaced);
            }
        }
        state.index.insert(key, embedding);
        Ok(())
    }

    async fn get(&self, ctx: &CancellationToken, key: &K) -> Result<Option<Entry<V>>> {
        ensure_live(ctx)?;
        // Recency refresh mutates the LRU list, hence the writer lock.
        let mut state = self.state.write();
        Ok(state.entries.get(key).cloned())
    }

    async fn delete(&self, ctx: &CancellationToken, key: &K) -> Result<()> {
        ensure_live(ctx)?;
        let mut state = self.state.write();
        state.entries.pop(key);
        state.index.remove(key);
        Ok(())
    }

    async fn contains(&self, ctx: &CancellationToken, key: &K) -> Result<bool> {
        ensure_live(ctx)?;
        Ok(self.state.read().entries.contains(key))
    }

    async fn keys(&self, ctx: &CancellationToken) -> Result<Vec<K>> {
        ensure_live(ctx)?;
        let state = self.state.read();
        Ok(state.entries.iter().map(|(k, _)| k.clone()).collect())
    }

    async fn get_embedding(&self, ctx: &CancellationToken, key: &K) -> Result<Option<Vec<f32>>> {
        ensure_live(ctx)?;
        Ok(self.state.read().index.get(key).cloned())
    }

    async fn len(&self, ctx: &CancellationToken) -> Result<usize> {
        ensure_live(ctx)?;
        Ok(self.state.read().entries.len())
    }

    async fn flush(&self, ctx: &CancellationToken) -> Result<()> {
        ensure_live(ctx)?;
        let mut state = self.state.write();
        state.entries.clear();
        state.index.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(v: &str) -> Entry<String> {
        Entry::new(vec![1.0, 0.0], v.to_string())
    }

    fn ctx() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let backend: LruBackend<String, String> = LruBackend::new(10);
        let ctx = ctx();
        backend.set(&ctx, "k1".into(), entry("v1")).await.unwrap();

        let got = backend.get(&ctx, &"k1".to_string()).await.unwrap().unwrap();
        assert_eq!(got.value, "v1");
        assert!(backend.get(&ctx, &"k2".to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lru_eviction_order() {
        let backend: LruBackend<String, String> = LruBackend::new(3);
        let ctx = ctx();
        for k in ["a", "b", "c"] {
            backend.set(&ctx, k.into(), entry(k)).await.unwrap();
        }

        // Touch "a" so "b" becomes least recently used.
        backend.get(&ctx, &"a".to_string()).await.unwrap();
        backend.set(&ctx, "d".into(), entry("d")).await.unwrap();

        assert!(!backend.contains(&ctx, &"b".to_string()).await.unwrap());
        assert!(backend.contains(&ctx, &"a".to_string()).await.unwrap());
        assert_eq!(backend.len(&ctx).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_index_tracks_eviction() {
        let backend: LruBackend<String, String> = LruBackend::new(2);
        let ctx = ctx();
        for k in ["a", "b", "c"] {
            backend.set(&ctx, k.into(), entry(k)).await.unwrap();
        }

        assert!(backend
            .get_embedding(&ctx, &"a".to_string())
            .await
            .unwrap()
            .is_none());
        let keys = backend.keys(&ctx).await.unwrap();
        for key in &keys {
            assert!(backend.get_embedding(&ctx, key).await.unwrap().is_some());
        }
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn test_replace_same_key_keeps_capacity() {
        let backend: LruBackend<String, String> = LruBackend::new(2);
        let ctx = ctx();
        backend.set(&ctx, "a".into(), entry("v1")).await.unwrap();
        backend
            .set(&ctx, "a".into(), Entry::new(vec![0.0, 1.0], "v2".into()))
            .await
            .unwrap();

        assert_eq!(backend.len(&ctx).await.unwrap(), 1);
        let got = backend.get(&ctx, &"a".to_string()).await.unwrap().unwrap();
        assert_eq!(got.value, "v2");
        assert_eq!(
            backend.get_embedding(&ctx, &"a".to_string()).await.unwrap(),
            Some(vec![0.0, 1.0])
        );
    }

    #[tokio::test]
    async fn test_unbounded_capacity() {
        let backend: LruBackend<u64, u64> = LruBackend::new(0);
        let ctx = ctx();
        for i in 1..=100u64 {
            backend.set(&ctx, i, Entry::new(vec![i as f32], i)).await.unwrap();
        }
        assert_eq!(backend.len(&ctx).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_delete_and_flush() {
        let backend: LruBackend<String, String> = LruBackend::new(5);
        let ctx = ctx();
        backend.set(&ctx, "a".into(), entry("a")).await.unwrap();
        backend.set(&ctx, "b".into(), entry("b")).await.unwrap();

        backend.delete(&ctx, &"a".to_string()).await.unwrap();
        assert!(backend.get_embedding(&ctx, &"a".to_string()).await.unwrap().is_none());
        // Deleting a missing key is fine.
        backend.delete(&ctx, &"a".to_string()).await.unwrap();

        backend.flush(&ctx).await.unwrap();
        assert_eq!(backend.len(&ctx).await.unwrap(), 0);
        assert!(backend.keys(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_rejected() {
        let backend: LruBackend<String, String> = LruBackend::new(5);
        let ctx = CancellationToken::new();
        ctx.cancel();
        assert!(backend.set(&ctx, "a".into(), entry("a")).await.is_err());
    }
}
