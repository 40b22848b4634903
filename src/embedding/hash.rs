//! Deterministic feature-hashing embedder
//!
//! A model-free provider that hashes word tokens into a fixed number of
//! signed buckets. Texts sharing vocabulary land near each other under
//! cosine similarity, which is enough for offline operation and for
//! exercising the index without a model download.

use super::provider::{normalize_vector, EmbeddingError, EmbeddingProvider, EmbeddingResult};
use crate::types::Embedding;
use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

/// Feature-hashing embedding provider
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
    model_id: String,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            model_id: format!("feature-hash-{}", dimensions),
        }
    }

    fn embed_one(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimensions];

        for word in text.to_lowercase().unicode_words() {
            let digest = Sha256::digest(word.as_bytes());
            let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
                as usize
                % self.dimensions;
            // Sign bit from the digest keeps bucket collisions unbiased
            let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalize_vector(&mut vector);
        vector
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
        if self.dimensions == 0 {
            return Err(EmbeddingError::EmbeddingFailed(
                "dimensions must be positive".to_string(),
            ));
        }
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
