//! Embedding provider trait definition

use crate::types::Embedding;
use std::fmt::Debug;

/// Errors that can occur during embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Embedding generation failed
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    /// Provider returned vectors of an unexpected dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Core trait for embedding providers
///
/// Implementations must be deterministic for a fixed `model_id`: the
/// same text always maps to the same vector. The trait is object-safe
/// for use as `dyn EmbeddingProvider`.
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate embeddings for a batch of texts
    fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>>;

    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        let mut batch = self.embed_batch(std::slice::from_ref(&text.to_string()))?;
        batch.pop().ok_or_else(|| {
            EmbeddingError::EmbeddingFailed("provider returned empty batch".to_string())
        })
    }

    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// Stable model identifier, persisted with the index
    fn model_id(&self) -> &str;
}

/// L2-normalize a vector in place so inner product equals cosine similarity.
/// Zero vectors are left unchanged.
pub(crate) fn normalize_vector(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize_vector(&mut v);
        let mag: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((mag - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        normalize_vector(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }
}
