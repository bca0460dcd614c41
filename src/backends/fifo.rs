//! First-in-first-out in-memory backend.

use crate::backends::{ensure_live, CacheBackend, Entry};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct FifoState<K, V> {
    entries: HashMap<K, Entry<V>>,
    index: HashMap<K, Vec<f32>>,
    queue: VecDeque<K>,
}

/// In-memory backend with FIFO eviction.
///
/// Entries leave in insertion order. `get` never reorders, and replacing an
/// existing key keeps its original queue position.
pub struct FifoBackend<K, V> {
    state: RwLock<FifoState<K, V>>,
    capacity: usize,
}

impl<K: Eq + Hash, V> FifoBackend<K, V> {
    /// Create a FIFO backend. A capacity of 0 disables eviction (unbounded).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(FifoState {
                entries: HashMap::new(),
                index: HashMap::new(),
                queue: VecDeque::with_capacity(capacity),
            }),
            capacity,
        }
    }
}

#[async_trait]
impl<K, V> CacheBackend<K, V> for FifoBackend<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn set(&self, ctx: &CancellationToken, key: K, entry: Entry<V>) -> Result<()> {
        ensure_live(ctx)?;
        let mut state = self.state.write();

        // Replace in place: no queue reorder for an existing key.
        if state.entries.contains_key(&key) {
            let embedding = entry.embedding.clone();
            state.entries.insert(key.clone(), entry);
            state.index.insert(key, embedding);
            return Ok(());
        }

        if self.capacity > 0 && state.entries.len() >= self.capacity {
            if let Some(oldest) = state.queue.pop_front() {
                debug!("fifo eviction");
                state.entries.remove(&oldest);
                state.index.remove(&oldest);
            }
        }

        let embedding = entry.embedding.clone();
        state.entries.insert(key.clone(), entry);
        state.index.insert(key.clone(), embedding);
        state.queue.push_back(key);
        Ok(())
    }

    async fn get(&self, ctx: &CancellationToken, key: &K) -> Result<Option<Entry<V>>> {
        ensure_live(ctx)?;
        Ok(self.state.read().entries.get(key).cloned())
    }

    async fn delete(&self, ctx: &CancellationToken, key: &K) -> Result<()> {
        ensure_live(ctx)?;
        let mut state = self.state.write();
        if state.entries.remove(key).is_none() {
            return Ok(());
        }
        state.index.remove(key);
        if let Some(pos) = state.queue.iter().position(|k| k == key) {
            let _ = state.queue.remove(pos);
        }
        Ok(())
    }

    async fn contains(&self, ctx: &CancellationToken, key: &K) -> Result<bool> {
        ensure_live(ctx)?;
        Ok(self.state.read().entries.contains_key(key))
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
        Ok(self.state.read().entries.len())
    }

    async fn flush(&self, ctx: &CancellationToken) -> Result<()> {
        ensure_live(ctx)?;
        let mut state = self.state.write();
        state.entries.clear();
        state.index.clear();
        state.queue.clear();
        Ok(())
    }
}
