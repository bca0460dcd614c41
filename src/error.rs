//! Error Types and Handling
//!
//! Error types for the recall semantic cache, with structured error codes
//! for programmatic handling.
//!
//! # Error Categories
//!
//! Errors are organized into categories with numeric codes:
//!
//! | Range | Category | Examples |
//! |-------|----------|----------|
//! | 1xxx | Configuration | MissingBackend, InvalidChunkSize |
//! | 2xxx | Input | ZeroKey, EmptyText, InvalidTopN |
//! | 3xxx | Provider | Embedding, BatchTooLarge, DimensionMismatch |
//! | 4xxx | Backend | Backend, Connection, Serialization |
//! | 5xxx | Operational | Cancelled, Timeout |
//!
//! # Example
//!
//! ```rust
//! use recall::error::{RecallError, ErrorCode};
//!
//! let err = RecallError::DimensionMismatch { expected: 1536, got: 384 };
//! assert_eq!(err.error_code(), ErrorCode::DimensionMismatch);
//! assert_eq!(err.error_code().category(), "Provider");
//! assert!(!err.is_retryable());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Error code categories for programmatic error handling.
///
/// Each error code belongs to a category indicated by its numeric range.
/// Use [`ErrorCode::category()`] to get the human-readable category name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No cache backend was configured
    MissingBackend = 1001,
    /// No embedding provider was configured
    MissingProvider = 1002,
    /// Chunker max-tokens threshold is zero
    InvalidMaxTokens = 1003,
    /// Chunk size is zero
    InvalidChunkSize = 1004,
    /// Chunk size exceeds the max-tokens threshold
    ChunkSizeExceedsMax = 1005,
    /// Chunk overlap is not smaller than the chunk size
    OverlapTooLarge = 1006,

    /// The key is its type's zero value
    ZeroKey = 2001,
    /// Text passed to the chunker is empty
    EmptyText = 2002,
    /// Requested match count is zero
    InvalidTopN = 2003,

    /// The embedding request failed
    EmbeddingFailed = 3001,
    /// The provider returned no embedding
    EmptyEmbedding = 3002,
    /// Embedding dimensions do not match the backend's expectation
    DimensionMismatch = 3003,
    /// Batch size exceeds the provider's limit
    BatchTooLarge = 3004,

    /// A backend storage operation failed
    StorageFailed = 4001,
    /// Connecting to or talking to a remote backend failed
    ConnectionFailed = 4002,
    /// Serializing or deserializing an entry failed
    SerializationFailed = 4003,
    /// Tokenizing text failed
    TokenizationFailed = 4004,

    /// The operation was cancelled via its cancellation token
    Cancelled = 5001,
    /// The operation timed out
    Timeout = 5002,
}

impl ErrorCode {
    /// Get the numeric error code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a brief description of the error category
    pub fn category(&self) -> &'static str {
        match self.code() {
            1000..=1999 => "Configuration",
            2000..=2999 => "Input",
            3000..=3999 => "Provider",
            4000..=4999 => "Backend",
            _ => "Operational",
        }
    }
}

/// Error type for recall semantic cache operations
#[must_use]
#[derive(Error, Debug)]
pub enum RecallError {
    #[error("no backend configured: set one with SemanticCacheBuilder::lru_backend or similar")]
    MissingBackend,

    #[error("no embedding provider configured: set one with SemanticCacheBuilder::provider")]
    MissingProvider,

    #[error("max tokens must be positive")]
    InvalidMaxTokens,

    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error("chunk size cannot exceed max tokens")]
    ChunkSizeExceedsMax,

    #[error("chunk overlap must be less than chunk size")]
    OverlapTooLarge,

    #[error("key cannot be the zero value")]
    ZeroKey,

    #[error("cannot chunk empty text")]
    EmptyText,

    #[error("match count must be positive")]
    InvalidTopN,

    #[error("embedding request failed: {0}")]
    Embedding(String),

    #[error("provider returned no embedding")]
    EmptyEmbedding,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("batch of {size} texts exceeds provider limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("storage error: {0}")]
    Backend(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("tokenization failed: {0}")]
    Tokenizer(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl RecallError {
    /// Get the error code for this error
    pub fn error_code(&self) -> ErrorCode {
        match self {
            RecallError::MissingBackend => ErrorCode::MissingBackend,
            RecallError::MissingProvider => ErrorCode::MissingProvider,
            RecallError::InvalidMaxTokens => ErrorCode::InvalidMaxTokens,
            RecallError::InvalidChunkSize => ErrorCode::InvalidChunkSize,
            RecallError::ChunkSizeExceedsMax => ErrorCode::ChunkSizeExceedsMax,
            RecallError::OverlapTooLarge => ErrorCode::OverlapTooLarge,
            RecallError::ZeroKey => ErrorCode::ZeroKey,
            RecallError::EmptyText => ErrorCode::EmptyText,
            RecallError::InvalidTopN => ErrorCode::InvalidTopN,
            RecallError::Embedding(_) => ErrorCode::EmbeddingFailed,
            RecallError::EmptyEmbedding => ErrorCode::EmptyEmbedding,
            RecallError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            RecallError::BatchTooLarge { .. } => ErrorCode::BatchTooLarge,
            RecallError::Backend(_) => ErrorCode::StorageFailed,
            RecallError::Connection(_) => ErrorCode::ConnectionFailed,
            RecallError::Serialization(_) => ErrorCode::SerializationFailed,
            RecallError::Tokenizer(_) => ErrorCode::TokenizationFailed,
            RecallError::Cancelled => ErrorCode::Cancelled,
            RecallError::Timeout(_) => ErrorCode::Timeout,
        }
    }

    /// Check if the error is retryable
    ///
    /// Transport failures and timeouts are worth retrying; configuration and
    /// validation errors are not. Cancellation is deliberately not retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RecallError::Connection(_) | RecallError::Timeout(_) | RecallError::Embedding(_)
        )
    }
}

/// Result type alias for recall operations
pub type Result<T> = std::result::Result<T, RecallError>;
