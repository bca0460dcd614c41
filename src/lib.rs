//! # Recall - Semantic Cache
//!
//! Recall is a semantic key/value cache: values are stored under exact keys,
//! but lookups can also search by *meaning*, matching a query text against
//! the embeddings of previously stored entries. Typical uses are LLM
//! response caches, FAQ matchers, and retrieval layers that want to reuse
//! prior answers for inputs that are semantically equivalent without being
//! textually identical.
//!
//! Three pluggable components do the work:
//!
//! - an [`EmbeddingProvider`] turns text into a fixed-dimension vector,
//! - a [`CacheBackend`] stores `(key -> (embedding, value))` pairs under an
//!   eviction discipline (LRU, LFU, FIFO, or Redis),
//! - a similarity kernel scores pairs of vectors (cosine by default).
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use recall::{MockConfig, MockProvider, SemanticCacheBuilder, Similarity};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> recall::Result<()> {
//!     let cache = SemanticCacheBuilder::<String, String>::new()
//!         .lru_backend(1000)
//!         .provider(Arc::new(MockProvider::new(MockConfig::new(384))))
//!         .comparator(Similarity::Cosine)
//!         .build()
//!         .await?;
//!
//!     let ctx = CancellationToken::new();
//!
//!     // Exact-key writes and reads
//!     cache.set(&ctx, "rust".into(), "What is Rust?", "A systems language.".into()).await?;
//!     assert_eq!(cache.get(&ctx, &"rust".to_string()).await?.as_deref(), Some("A systems language."));
//!
//!     // Similarity search over everything stored
//!     if let Some(m) = cache.lookup(&ctx, "What is Rust?", 0.8).await? {
//!         println!("semantic hit: {} (score {:.3})", m.value, m.score);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Exact-key API**: `set` / `get` / `contains` / `delete` / `flush`,
//!   plus serial and concurrent batch variants
//! - **Similarity search**: `lookup` (best match over a threshold) and
//!   `top_matches` (ranked top-n)
//! - **Long-input chunking**: inputs over the provider's token ceiling are
//!   split into overlapping token windows and stored as one averaged vector
//! - **Async everywhere**: every operation is async, takes a cancellation
//!   token, and has a spawned `*_async` variant delivering through a
//!   one-shot channel
//! - **Eviction with index coherence**: in-memory backends keep a
//!   `key -> embedding` index in lockstep with the value store, under a
//!   single reader/writer lock
//!
//! ## Cargo Features
//!
//! - `remote` (default): Redis backend with namespaced JSON documents and an
//!   optional RediSearch KNN fast path
//! - `huggingface`: token-exact chunking via the HuggingFace `tokenizers`
//!   crate

pub mod backends;
pub mod builder;
pub mod cache;
pub mod chunker;
pub mod error;
pub mod providers;
pub mod similarity;
pub mod tokenizer;

pub use backends::{CacheBackend, Entry, FifoBackend, LfuBackend, LruBackend};
#[cfg(feature = "remote")]
pub use backends::{RedisBackend, RedisBackendConfig};
pub use builder::SemanticCacheBuilder;
pub use cache::{BatchItem, Match, SemanticCache};
pub use chunker::{Chunk, ChunkConfig, ChunkStrategy, FixedOverlapChunker};
pub use error::{ErrorCode, RecallError, Result};
pub use providers::{
    BatchEmbeddingProvider, EmbeddingProvider, MockConfig, MockProvider, OpenAiConfig,
    OpenAiProvider,
};
pub use similarity::{Comparator, Similarity};
#[cfg(feature = "huggingface")]
pub use tokenizer::HuggingFaceTokenizer;
pub use tokenizer::{Tokenizer, WhitespaceTokenizer};
