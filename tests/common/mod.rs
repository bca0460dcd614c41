//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use recall::{BatchEmbeddingProvider, EmbeddingProvider};
use std::collections::HashMap;

/// Provider with a fixed text -> vector table.
///
/// Unknown text maps to `(0.5, 0.5, 0.5)`, so queries for unrelated words
/// score low against the fixture vectors without erroring.
pub struct MappedProvider {
    map: HashMap<String, Vec<f32>>,
    max_tokens: usize,
}

impl MappedProvider {
    pub fn new(entries: &[(&str, &[f32])]) -> Self {
        Self {
            map: entries
                .iter()
                .map(|(text, vec)| (text.to_string(), vec.to_vec()))
                .collect(),
            max_tokens: 8191,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for MappedProvider {
    async fn embed_text(&self, text: &str) -> recall::Result<Vec<f32>> {
        Ok(self
            .map
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.5, 0.5, 0.5]))
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }
}

/// The standard three-vector fixture used across the lookup tests.
pub fn fixture_provider() -> MappedProvider {
    MappedProvider::new(&[
        ("hello", &[1.0, 0.0, 0.0]),
        ("world", &[0.0, 1.0, 0.0]),
        ("similar", &[0.9, 0.1, 0.0]),
    ])
}

/// Deterministic vector derived from the text, for providers that must
/// embed arbitrary chunk texts reproducibly.
pub fn vector_for(text: &str) -> Vec<f32> {
    let byte_sum: u32 = text.bytes().map(u32::from).sum();
    vec![text.len() as f32, (byte_sum % 97) as f32, 1.0]
}

/// Provider that records every call, for asserting how the cache embeds.
///
/// With `batch` enabled it advertises the batch capability and records the
/// text lists handed to `embed_batch`; otherwise only single-text calls
/// are recorded.
pub struct RecordingProvider {
    batch: bool,
    max_tokens: usize,
    pub embed_texts: Mutex<Vec<String>>,
    pub batch_texts: Mutex<Vec<Vec<String>>>,
}

impl RecordingProvider {
    pub fn new(batch: bool, max_tokens: usize) -> Self {
        Self {
            batch,
            max_tokens,
            embed_texts: Mutex::new(Vec::new()),
            batch_texts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for RecordingProvider {
    async fn embed_text(&self, text: &str) -> recall::Result<Vec<f32>> {
        self.embed_texts.lock().push(text.to_string());
        Ok(vector_for(text))
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn as_batch(&self) -> Option<&dyn BatchEmbeddingProvider> {
        if self.batch {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl BatchEmbeddingProvider for RecordingProvider {
    async fn embed_batch(&self, texts: &[String]) -> recall::Result<Vec<Vec<f32>>> {
        self.batch_texts.lock().push(texts.to_vec());
        Ok(texts.iter().map(|t| vector_for(t)).collect())
    }
}

/// Component-wise mean, the reference for aggregation assertions.
pub fn mean(vectors: &[Vec<f32>]) -> Vec<f32> {
    let dim = vectors[0].len();
    let mut out = vec![0.0f32; dim];
    for v in vectors {
        for (acc, x) in out.iter_mut().zip(v) {
            *acc += x;
        }
    }
    for x in &mut out {
        *x /= vectors.len() as f32;
    }
    out
}
