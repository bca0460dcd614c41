//! Least-frequently-used in-memory backend.

use crate::backends::{ensure_live, CacheBackend, Entry};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct LfuSlot<V> {
    entry: Entry<V>,
    frequency: u64,
    // Insertion order, used to break frequency ties deterministically.
    seq: u64,
}

struct LfuState<K, V> {
    slots: HashMap<K, LfuSlot<V>>,
    index: HashMap<K, Vec<f32>>,
    next_seq: u64,
}

/// In-memory backend with LFU eviction.
///
/// `get` increments the touched entry's frequency, as does `set` on an
/// existing key. `contains`, `keys`, and `get_embedding` never do. On
/// overflow the entry with the smallest frequency is evicted; ties go to
/// the oldest-inserted entry, so eviction is deterministic within a run.
pub struct LfuBackend<K, V> {
    state: RwLock<LfuState<K, V>>,
    capacity: usize,
}

impl<K: Eq + Hash, V> LfuBackend<K, V> {
    /// Create an LFU backend. A capacity of 0 disables eviction (unbounded).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(LfuState {
                slots: HashMap::new(),
                index: HashMap::new(),
                next_seq: 0,
            }),
            capacity,
        }
    }
}

impl<K: Clone + Eq + Hash, V> LfuState<K, V> {
    fn evict_lfu(&mut self) {
        let victim = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| (slot.frequency, slot.seq))
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            debug!("lfu eviction");
            self.slots.remove(&key);
            self.index.remove(&key);
        }
    }
}

#[async_trait]
impl<K, V> CacheBackend<K, V> for LfuBackend<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn set(&self, ctx: &CancellationToken, key: K, entry: Entry<V>) -> Result<()> {
        ensure_live(ctx)?;
        let mut state = self.state.write();

        if let Some(slot) = state.slots.get_mut(&key) {
            let embedding = entry.embedding.clone();
            slot.entry = entry;
            slot.frequency += 1;
            state.index.insert(key, embedding);
            return Ok(());
        }

        if self.capacity > 0 && state.slots.len() >= self.capacity {
            state.evict_lfu();
        }

        let embedding = entry.embedding.clone();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.slots.insert(
            key.clone(),
            LfuSlot {
                entry,
                frequency: 1,
                seq,
            },
        );
        state.index.insert(key, embedding);
        Ok(())
    }

    async fn get(&self, ctx: &CancellationToken, key: &K) -> Result<Option<Entry<V>>> {
        ensure_live(ctx)?;
        // Frequency bump mutates backend state, hence the writer lock.
        let mut state = self.state.write();
        Ok(state.slots.get_mut(key).map(|slot| {
            slot.frequency += 1;
            slot.entry.clone()
        }))
    }

    async fn delete(&self, ctx: &CancellationToken, key: &K) -> Result<()> {
        ensure_live(ctx)?;
        let mut state = self.state.write();
        state.slots.remove(key);
        state.index.remove(key);
        Ok(())
    }

    async fn contains(&self, ctx: &CancellationToken, key: &K) -> Result<bool> {
        ensure_live(ctx)?;
        Ok(self.state.read().slots.contains_key(key))
    }

    async fn keys(&self, ctx: &CancellationToken) -> Result<Vec<K>> {
        ensure_live(ctx)?;
        Ok(self.state.read().index.keys().cloned().collect())
    }

    async fn get_embedding(&self, ctx: &CancellationToken, key: &K) -> Result<Option<Vec<f32>>> {
        ensure_live(ctx)?;
        Ok(self.state.read().index.get(key).cloned())
    }

    async fn len(&self, ctx: &CancellationToken) -> Result<usize> {
        ensure_live(ctx)?;
        Ok(self.state.read().slots.len())
    }

    async fn flush(&self, ctx: &CancellationToken) -> Result<()> {
        ensure_live(ctx)?;
        let mut state = self.state.write();
        state.slots.clear();
        state.index.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(v: &str) -> Entry<String> {
        Entry::new(vec![1.0], v.to_string())
    }

    fn ctx() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn test_evicts_least_frequent() {
        let backend: LfuBackend<String, String> = LfuBackend::new(2);
        let ctx = ctx();
        backend.set(&ctx, "hot".into(), entry("h")).await.unwrap();
        backend.set(&ctx, "cold".into(), entry("c")).await.unwrap();

        for _ in 0..5 {
            backend.get(&ctx, &"hot".to_string()).await.unwrap();
        }

        backend.set(&ctx, "new".into(), entry("n")).await.unwrap();
        assert!(!backend.contains(&ctx, &"cold".to_string()).await.unwrap());
        assert!(backend.contains(&ctx, &"hot".to_string()).await.unwrap());
        assert_eq!(backend.len(&ctx).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_tie_breaks_to_oldest() {
        let backend: LfuBackend<String, String> = LfuBackend::new(3);
        let ctx = ctx();
        // All at frequency 1; "a" is oldest.
        for k in ["a", "b", "c"] {
            backend.set(&ctx, k.into(), entry(k)).await.unwrap();
        }
        backend.set(&ctx, "d".into(), entry("d")).await.unwrap();

        assert!(!backend.contains(&ctx, &"a".to_string()).await.unwrap());
        assert!(backend.contains(&ctx, &"b".to_string()).await.unwrap());
        assert!(backend.contains(&ctx, &"c".to_string()).await.unwrap());
    }

    #[tokio::test]
    async fn test_presence_checks_do_not_bump_frequency() {
        let backend: LfuBackend<String, String> = LfuBackend::new(2);
        let ctx = ctx();
        backend.set(&ctx, "a".into(), entry("a")).await.unwrap();
        backend.set(&ctx, "b".into(), entry("b")).await.unwrap();

        // Probe "a" through every non-counting read.
        for _ in 0..10 {
            backend.contains(&ctx, &"a".to_string()).await.unwrap();
            backend.get_embedding(&ctx, &"a".to_string()).await.unwrap();
            backend.keys(&ctx).await.unwrap();
        }
        // Count "b" once via get; now freq(b)=2 > freq(a)=1.
        backend.get(&ctx, &"b".to_string()).await.unwrap();

        backend.set(&ctx, "c".into(), entry("c")).await.unwrap();
        assert!(!backend.contains(&ctx, &"a".to_string()).await.unwrap());
        assert!(backend.contains(&ctx, &"b".to_string()).await.unwrap());
    }

    #[tokio::test]
    async fn test_replacing_set_bumps_frequency() {
        let backend: LfuBackend<String, String> = LfuBackend::new(2);
        let ctx = ctx();
        backend.set(&ctx, "a".into(), entry("a1")).await.unwrap();
        backend.set(&ctx, "a".into(), entry("a2")).await.unwrap(); // freq(a)=2
        backend.set(&ctx, "b".into(), entry("b")).await.unwrap(); // freq(b)=1

        backend.set(&ctx, "c".into(), entry("c")).await.unwrap();
        assert!(!backend.contains(&ctx, &"b".to_string()).await.unwrap());
        let got = backend.get(&ctx, &"a".to_string()).await.unwrap().unwrap();
        assert_eq!(got.value, "a2");
    }

    #[tokio::test]
    async fn test_index_coherence_after_eviction() {
        let backend: LfuBackend<String, String> = LfuBackend::new(2);
        let ctx = ctx();
        for k in ["a", "b", "c", "d"] {
            backend.set(&ctx, k.into(), entry(k)).await.unwrap();
        }

        let keys = backend.keys(&ctx).await.unwrap();
        assert_eq!(keys.len(), 2);
        for key in &keys {
            assert!(backend.get_embedding(&ctx, key).await.unwrap().is_some());
            assert!(backend.contains(&ctx, key).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_unbounded_capacity() {
        let backend: LfuBackend<u64, u64> = LfuBackend::new(0);
        let ctx = ctx();
        for i in 1..=50u64 {
            backend.set(&ctx, i, Entry::new(vec![1.0], i)).await.unwrap();
        }
        assert_eq!(backend.len(&ctx).await.unwrap(), 50);
    }
}
