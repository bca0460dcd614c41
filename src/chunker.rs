//! Text Chunking for Long Inputs
//!
//! Embedding models reject inputs above their token ceiling, so the cache
//! splits overlong text into overlapping fixed-token windows before
//! embedding. Chunk boundaries are deterministic: the same text and
//! configuration always produce the same token ranges.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use recall::chunker::{ChunkConfig, FixedOverlapChunker};
//! use recall::tokenizer::WhitespaceTokenizer;
//!
//! let config = ChunkConfig {
//!     max_tokens: 10,
//!     chunk_size: 5,
//!     chunk_overlap: 1,
//!     ..ChunkConfig::default()
//! };
//! let chunker = FixedOverlapChunker::new(config, Arc::new(WhitespaceTokenizer::new())).unwrap();
//!
//! let chunks = chunker.chunk_text("one two three four five six seven").unwrap();
//! assert_eq!(chunks.len(), 2);
//! assert_eq!((chunks[0].start_token, chunks[0].end_token), (0, 5));
//! assert_eq!((chunks[1].start_token, chunks[1].end_token), (4, 7));
//! ```

use crate::error::{RecallError, Result};
use crate::tokenizer::Tokenizer;
use std::sync::Arc;

/// The chunking algorithm to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkStrategy {
    /// Fixed-size token windows with overlap between adjacent chunks
    #[default]
    FixedOverlap,
}

/// Configuration for text chunking behavior.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Threshold that triggers chunking. Text whose token count exceeds
    /// this limit is split into chunks. At the builder level, 0 means
    /// "take the limit from the embedding provider".
    pub max_tokens: usize,

    /// Target number of tokens per chunk
    pub chunk_size: usize,

    /// Tokens shared between adjacent chunks, preserving context at
    /// chunk boundaries
    pub chunk_overlap: usize,

    /// Chunking algorithm
    pub strategy: ChunkStrategy,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            // OpenAI text-embedding-3-small input ceiling
            max_tokens: 8191,
            chunk_size: 512,
            chunk_overlap: 50,
            strategy: ChunkStrategy::FixedOverlap,
        }
    }
}

impl ChunkConfig {
    /// Check that the configuration is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(RecallError::InvalidMaxTokens);
        }
        if self.chunk_size == 0 {
            return Err(RecallError::InvalidChunkSize);
        }
        if self.chunk_size > self.max_tokens {
            return Err(RecallError::ChunkSizeExceedsMax);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RecallError::OverlapTooLarge);
        }
        Ok(())
    }
}

/// A single chunk of text with its token range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The text content of this chunk
    pub text: String,
    /// Starting token index in the original text (inclusive)
    pub start_token: usize,
    /// Ending token index in the original text (exclusive)
    pub end_token: usize,
    /// 0-based position of this chunk in the emission sequence
    pub index: usize,
}

/// Splits text into fixed-size overlapping token windows.
pub struct FixedOverlapChunker {
    config: ChunkConfig,
    tokenizer: Arc<dyn Tokenizer>,
}

impl FixedOverlapChunker {
    /// Create a chunker, validating the configuration up front.
    pub fn new(config: ChunkConfig, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, tokenizer })
    }

    /// Count the tokens in `text`; the empty string counts as 0.
    pub fn count_tokens(&self, text: &str) -> Result<usize> {
        self.tokenizer.count_tokens(text)
    }

    /// The token threshold above which chunking applies.
    ///
    /// Exposed so the cache can decide whether chunking is needed without
    /// re-reading the configuration.
    pub fn max_tokens(&self) -> usize {
        self.config.max_tokens
    }

    /// Split `text` into overlapping chunks based on token count.
    ///
    /// Text that fits within `chunk_size` tokens comes back as a single
    /// chunk carrying the original text verbatim. Longer text is sliced at
    /// a stride of `chunk_size - chunk_overlap` tokens; each chunk's text is
    /// the decoded form of its token slice.
    pub fn chunk_text(&self, text: &str) -> Result<Vec<Chunk>> {
        if text.is_empty() {
            return Err(RecallError::EmptyText);
        }

        let tokens = self.tokenizer.encode(text)?;
        let total = tokens.len();

        if total <= self.config.chunk_size {
            return Ok(vec![Chunk {
                text: text.to_string(),
                start_token: 0,
                end_token: total,
                index: 0,
            }]);
        }

        let mut stride = self.config.chunk_size - self.config.chunk_overlap;
        if stride == 0 {
            // Misconfigured overlap; degrade to non-overlapping windows.
            stride = self.config.chunk_size;
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < total {
            let end = (start + self.config.chunk_size).min(total);
            let chunk_text = self.tokenizer.decode(&tokens[start..end])?;
            chunks.push(Chunk {
                text: chunk_text,
                start_token: start,
                end_token: end,
                index: chunks.len(),
            });
            if end >= total {
                break;
            }
            start += stride;
        }

        Ok(chunks)
    }
}
