//! Tokenizers for Token-Accurate Chunking
//!
//! The chunker counts and slices text in token units, so it needs a
//! [`Tokenizer`] that can round-trip text through token IDs. Two
//! implementations ship with the crate:
//!
//! - [`WhitespaceTokenizer`]: a deterministic, dependency-free tokenizer that
//!   treats whitespace-separated words as tokens. It is the default and is
//!   well suited to tests and to providers without a published vocabulary.
//! - [`HuggingFaceTokenizer`] (feature `huggingface`): an adapter over the
//!   `tokenizers` crate for model-exact token counts, loaded from a
//!   `tokenizer.json` file.

use crate::error::{RecallError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Turns text into token IDs and back.
///
/// Implementations must be deterministic: encoding the same text twice yields
/// the same IDs within a tokenizer instance, and `decode(encode(text))`
/// yields text that re-encodes to the same ID sequence.
pub trait Tokenizer: Send + Sync {
    /// Encode text into a sequence of token IDs
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode a sequence of token IDs back into text
    fn decode(&self, ids: &[u32]) -> Result<String>;

    /// Count the tokens in `text`; the empty string counts as 0 tokens
    fn count_tokens(&self, text: &str) -> Result<usize> {
        if text.is_empty() {
            return Ok(0);
        }
        Ok(self.encode(text)?.len())
    }
}

/// Whitespace-word tokenizer with an on-the-fly vocabulary.
///
/// Each distinct whitespace-separated word is assigned the next free ID the
/// first time it is seen, so encoding is deterministic within an instance.
/// Decoding joins words with single spaces; runs of whitespace in the input
/// are not preserved.
#[derive(Default)]
pub struct WhitespaceTokenizer {
    vocab: RwLock<Vocab>,
}

#[derive(Default)]
struct Vocab {
    ids: HashMap<String, u32>,
    words: Vec<String>,
}

impl WhitespaceTokenizer {
    /// Create a tokenizer with an empty vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct words seen so far
    pub fn vocab_size(&self) -> usize {
        self.vocab.read().words.len()
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let mut vocab = self.vocab.write();
        let mut ids = Vec::new();
        for word in text.split_whitespace() {
            let id = match vocab.ids.get(word) {
                Some(id) => *id,
                None => {
                    let id = vocab.words.len() as u32;
                    vocab.ids.insert(word.to_string(), id);
                    vocab.words.push(word.to_string());
                    id
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        let vocab = self.vocab.read();
        let mut words = Vec::with_capacity(ids.len());
        for id in ids {
            let word = vocab
                .words
                .get(*id as usize)
                .ok_or_else(|| RecallError::Tokenizer(format!("unknown token id {id}")))?;
            words.push(word.as_str());
        }
        Ok(words.join(" "))
    }
}

/// Adapter over a HuggingFace `tokenizers` tokenizer.
///
/// Provides model-exact token counts for chunking decisions. Special tokens
/// are not added during encoding and are skipped during decoding, so token
/// ranges map cleanly onto the input text.
#[cfg(feature = "huggingface")]
pub struct HuggingFaceTokenizer {
    inner: tokenizers::Tokenizer,
}

#[cfg(feature = "huggingface")]
impl HuggingFaceTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| RecallError::Tokenizer(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Wrap an already-constructed tokenizer
    pub fn from_tokenizer(inner: tokenizers::Tokenizer) -> Self {
        Self { inner }
    }
}

#[cfg(feature = "huggingface")]
impl Tokenizer for HuggingFaceTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| RecallError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| RecallError::Tokenizer(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_empty() {
        let tok = WhitespaceTokenizer::new();
        assert_eq!(tok.count_tokens("").unwrap(), 0);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let tok = WhitespaceTokenizer::new();
        let a = tok.encode("the quick brown fox").unwrap();
        let b = tok.encode("the quick brown fox").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_repeated_words_share_ids() {
        let tok = WhitespaceTokenizer::new();
        let ids = tok.encode("to be or not to be").unwrap();
        assert_eq!(ids[0], ids[4]);
        assert_eq!(ids[1], ids[5]);
        assert_eq!(tok.vocab_size(), 4);
    }

    #[test]
    fn test_round_trip() {
        let tok = WhitespaceTokenizer::new();
        let text = "semantic caches reuse prior answers";
        let ids = tok.encode(text).unwrap();
        assert_eq!(tok.decode(&ids).unwrap(), text);
    }

    #[test]
    fn test_decode_unknown_id() {
        let tok = WhitespaceTokenizer::new();
        assert!(tok.decode(&[42]).is_err());
    }

    #[test]
    fn test_whitespace_collapsed() {
        let tok = WhitespaceTokenizer::new();
        let ids = tok.encode("a   b\t\nc").unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(tok.decode(&ids).unwrap(), "a b c");
    }
}
