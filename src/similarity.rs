//! Similarity Kernels for Embedding Vectors
//!
//! This module provides similarity metrics for comparing embedding vectors.
//! Every kernel maps a pair of equal-length vectors to a score where
//! **higher means more similar**, so kernels are interchangeable as the
//! cache's comparator.
//!
//! # Supported Kernels
//!
//! - **Cosine**: angle between vectors, in `[-1, 1]`. Best for text embeddings.
//! - **Euclidean**: `1 / (1 + L2 distance)`, in `(0, 1]`. Identical vectors score 1.
//! - **Dot product**: raw inner product, unbounded. For magnitude-aware scoring.
//! - **Manhattan**: `1 / (1 + L1 distance)`, in `(0, 1]`. Robust to outliers.
//! - **Pearson**: centered cosine (correlation), in `[-1, 1]`.
//!
//! Mismatched lengths and empty inputs score 0 rather than panicking, so a
//! scan over heterogeneous entries never aborts on one bad vector.
//!
//! # Example
//!
//! ```
//! use recall::similarity::{cosine_similarity, Similarity};
//!
//! let a = vec![1.0, 0.0, 0.0];
//! let b = vec![0.0, 1.0, 0.0];
//!
//! // Orthogonal vectors have cosine similarity of 0
//! assert!(cosine_similarity(&a, &b).abs() < 1e-6);
//! assert!((Similarity::Cosine.compute(&a, &a) - 1.0).abs() < 1e-6);
//! ```

use std::sync::Arc;

/// A comparator over two embedding vectors; higher output means more similar.
///
/// The builder accepts any closure with this shape, so callers can plug in
/// their own scoring function alongside the built-in kernels.
pub type Comparator = Arc<dyn Fn(&[f32], &[f32]) -> f32 + Send + Sync>;

/// Built-in similarity kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Similarity {
    /// Cosine similarity (angle between vectors)
    #[default]
    Cosine,
    /// Inverse Euclidean (L2) distance
    Euclidean,
    /// Raw dot product (no normalization)
    DotProduct,
    /// Inverse Manhattan (L1) distance
    Manhattan,
    /// Pearson correlation coefficient
    Pearson,
}

impl Similarity {
    /// Compute the similarity between two vectors
    #[inline]
    pub fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::Euclidean => euclidean_similarity(a, b),
            Self::DotProduct => dot_product_similarity(a, b),
            Self::Manhattan => manhattan_similarity(a, b),
            Self::Pearson => pearson_similarity(a, b),
        }
    }

    /// Wrap this kernel as a [`Comparator`] for the cache builder
    pub fn comparator(self) -> Comparator {
        Arc::new(move |a, b| self.compute(a, b))
    }
}

/// Compute cosine similarity: `⟨a,b⟩ / (‖a‖·‖b‖)`, in `[-1, 1]`.
///
/// Returns 0 when lengths differ, either vector is empty, or either norm
/// is zero.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Compute similarity from Euclidean (L2) distance as `1 / (1 + distance)`.
///
/// The result is in `(0, 1]`; identical vectors score exactly 1. Returns 0
/// when lengths differ or either vector is empty.
#[inline]
pub fn euclidean_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut sum = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        let diff = x - y;
        sum += diff * diff;
    }

    1.0 / (1.0 + sum.sqrt())
}

/// Compute the raw dot product of two vectors.
///
/// No normalization is applied, so results depend on vector magnitudes.
/// Returns 0 when lengths differ or either vector is empty.
#[inline]
pub fn dot_product_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute similarity from Manhattan (L1) distance as `1 / (1 + distance)`.
///
/// The result is in `(0, 1]`; identical vectors score exactly 1. Returns 0
/// when lengths differ or either vector is empty.
#[inline]
pub fn manhattan_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let sum: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum();
    1.0 / (1.0 + sum)
}

/// Compute the Pearson correlation coefficient, in `[-1, 1]`.
///
/// Equivalent to cosine similarity over mean-centered vectors. Returns 0
/// when lengths differ, either vector is empty, or either centered norm is
/// zero (constant vectors).
#[inline]
pub fn pearson_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let n = a.len() as f32;
    let mut mean_a = 0.0f32;
    let mut mean_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        mean_a += x;
        mean_b += y;
    }
    mean_a /= n;
    mean_b /= n;

    let mut numerator = 0.0f32;
    let mut sum_sq_a = 0.0f32;
    let mut sum_sq_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        numerator += da * db;
        sum_sq_a += da * da;
        sum_sq_b += db * db;
    }

    let denominator = (sum_sq_a * sum_sq_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    numerator / denominator
}
