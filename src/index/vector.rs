//! Exact nearest-neighbor index over chunk splits
//!
//! Embeddings are L2-normalized at build time, so inner product equals
//! cosine similarity. Search is exhaustive: at the tens-of-thousands
//! scale this corpus runs at, exact inner product is fast enough and
//! avoids the recall tuning an approximate structure would need.
//!
//! Search operates at split granularity; results are reported back at
//! chunk granularity through the split-to-chunk mapping, which is why
//! the mapping is persisted alongside the vectors.

use crate::chunking::TextSplitter;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::error::{Result, RetrievalError};
use crate::types::{Chunk, ChunkId};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A split-level search hit
#[derive(Debug, Clone, PartialEq)]
pub struct SplitHit {
    /// Insertion index of the split in the index
    pub split_index: usize,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Immutable exact-search vector index
///
/// A `VectorIndex` only exists in the built state: the constructor runs
/// the whole indexing pass before returning, so a handle doubles as the
/// build-complete signal and queries can never observe a torn index.
#[derive(Debug)]
pub struct VectorIndex {
    dimensions: usize,
    model_id: String,
    /// Row-major normalized vectors, one row per split
    vectors: Vec<f32>,
    split_to_chunk: Vec<ChunkId>,
    chunk_to_splits: HashMap<ChunkId, Vec<usize>>,
}

impl VectorIndex {
    /// Build an index by splitting and embedding every non-empty chunk.
    ///
    /// Fails with [`RetrievalError::EmptyCorpus`] when no chunk yields a
    /// non-empty split.
    pub fn build(
        chunks: &[Chunk],
        splitter: &TextSplitter,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        let mut split_texts: Vec<String> = Vec::new();
        let mut split_to_chunk: Vec<ChunkId> = Vec::new();

        for chunk in chunks {
            if chunk.text.trim().is_empty() {
                continue;
            }
            for piece in splitter.split(&chunk.text) {
                if piece.trim().is_empty() {
                    continue;
                }
                split_texts.push(piece);
                split_to_chunk.push(chunk.id.clone());
            }
        }

        if split_texts.is_empty() {
            return Err(RetrievalError::EmptyCorpus);
        }

        debug!(
            "embedding {} splits from {} chunks",
            split_texts.len(),
            chunks.len()
        );

        let dimensions = embedder.dimensions();
        let embeddings = embedder.embed_batch(&split_texts)?;

        let mut vectors = Vec::with_capacity(embeddings.len() * dimensions);
        for embedding in &embeddings {
            if embedding.len() != dimensions {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: dimensions,
                    actual: embedding.len(),
                }
                .into());
            }
            let mut row = embedding.clone();
            crate::embedding::normalize_vector(&mut row);
            vectors.extend_from_slice(&row);
        }

        let mut chunk_to_splits: HashMap<ChunkId, Vec<usize>> = HashMap::new();
        for (idx, chunk_id) in split_to_chunk.iter().enumerate() {
            chunk_to_splits.entry(chunk_id.clone()).or_default().push(idx);
        }

        info!(
            "built vector index: {} splits from {} chunks, {} dims, model {}",
            split_to_chunk.len(),
            chunk_to_splits.len(),
            dimensions,
            embedder.model_id()
        );

        Ok(Self {
            dimensions,
            model_id: embedder.model_id().to_string(),
            vectors,
            split_to_chunk,
            chunk_to_splits,
        })
    }

    /// Reassemble an index from persisted parts. Callers must have
    /// cross-validated the artifact counts first (see the snapshot module).
    pub(crate) fn from_parts(
        dimensions: usize,
        model_id: String,
        vectors: Vec<f32>,
        split_to_chunk: Vec<ChunkId>,
        chunk_to_splits: HashMap<ChunkId, Vec<usize>>,
    ) -> Self {
        Self {
            dimensions,
            model_id,
            vectors,
            split_to_chunk,
            chunk_to_splits,
        }
    }

    /// Top-`k` splits by cosine similarity, descending; ties broken by
    /// split insertion order. Re-running against an unmodified index
    /// returns identical ordered results.
    pub fn search(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<SplitHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if embedder.dimensions() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedder.dimensions(),
            }
            .into());
        }
        if embedder.model_id() != self.model_id {
            // Scores are meaningless across models; surface it loudly but
            // leave the decision to the caller
            warn!(
                "query embedded with model '{}' but index was built with '{}'",
                embedder.model_id(),
                self.model_id
            );
        }

        let mut query_vec = embedder.embed(query)?;
        crate::embedding::normalize_vector(&mut query_vec);

        let mut hits: Vec<SplitHit> = self
            .vectors
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(split_index, row)| SplitHit {
                split_index,
                score: row.iter().zip(query_vec.iter()).map(|(a, b)| a * b).sum(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.split_index.cmp(&b.split_index))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Top-`k` results at chunk granularity: split hits mapped to their
    /// owning chunk, deduplicated keeping each chunk's best split score.
    pub fn search_chunks(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<(ChunkId, f32)>> {
        // Over-fetch at split granularity: one chunk can occupy several
        // of the top splits
        let split_k = k.saturating_mul(2).max(k);
        let hits = self.search(query, split_k, embedder)?;

        let mut seen: HashMap<&ChunkId, ()> = HashMap::new();
        let mut results: Vec<(ChunkId, f32)> = Vec::new();
        for hit in &hits {
            let chunk_id = &self.split_to_chunk[hit.split_index];
            if seen.insert(chunk_id, ()).is_none() {
                results.push((chunk_id.clone(), hit.score));
                if results.len() >= k {
                    break;
                }
            }
        }
        Ok(results)
    }

    pub fn split_count(&self) -> usize {
        self.split_to_chunk.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_to_splits.len()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Owning chunk of a split index
    pub fn chunk_of_split(&self, split_index: usize) -> Option<&ChunkId> {
        self.split_to_chunk.get(split_index)
    }

    /// Split indices belonging to a chunk
    pub fn splits_of_chunk(&self, chunk_id: &str) -> Option<&[usize]> {
        self.chunk_to_splits.get(chunk_id).map(|v| v.as_slice())
    }

    pub(crate) fn vectors(&self) -> &[f32] {
        &self.vectors
    }

    pub(crate) fn split_to_chunk(&self) -> &[ChunkId] {
        &self.split_to_chunk
    }

    pub(crate) fn chunk_to_splits(&self) -> &HashMap<ChunkId, Vec<usize>> {
        &self.chunk_to_splits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitterConfig;
    use crate::embedding::HashEmbedder;

    fn splitter() -> TextSplitter {
        TextSplitter::new(&SplitterConfig::default())
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            Chunk::new("cats", "cats are mammals"),
            Chunk::new("dogs", "dogs are mammals"),
            Chunk::new("rust", "rust is a language"),
        ]
    }

    #[test]
    fn test_build_rejects_empty_corpus() {
        let embedder = HashEmbedder::new(64);
        let err = VectorIndex::build(&[], &splitter(), &embedder).unwrap_err();
        assert!(matches!(err, RetrievalError::EmptyCorpus));

        let whitespace = vec![Chunk::new("w", "   \n  ")];
        let err = VectorIndex::build(&whitespace, &splitter(), &embedder).unwrap_err();
        assert!(matches!(err, RetrievalError::EmptyCorpus));
    }

    #[test]
    fn test_mammal_chunks_outrank_rust_chunk() {
        let embedder = HashEmbedder::new(256);
        let index = VectorIndex::build(&corpus(), &splitter(), &embedder).unwrap();

        let results = index.search_chunks("mammals", 2, &embedder).unwrap();
        assert_eq!(results.len(), 2);
        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert!(ids.contains(&"cats"));
        assert!(ids.contains(&"dogs"));
    }

    #[test]
    fn test_search_is_idempotent() {
        let embedder = HashEmbedder::new(128);
        let index = VectorIndex::build(&corpus(), &splitter(), &embedder).unwrap();

        let first = index.search("mammals", 3, &embedder).unwrap();
        let second = index.search("mammals", 3, &embedder).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_scores_within_cosine_range() {
        let embedder = HashEmbedder::new(128);
        let index = VectorIndex::build(&corpus(), &splitter(), &embedder).unwrap();

        for hit in index.search("mammals", 3, &embedder).unwrap() {
            assert!(hit.score >= -1.0 - 1e-5 && hit.score <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn test_long_chunk_produces_multiple_splits_one_chunk() {
        let embedder = HashEmbedder::new(64);
        let long_text = "mammals everywhere in this text. ".repeat(40);
        let chunks = vec![Chunk::new("long", long_text)];
        let index = VectorIndex::build(&chunks, &splitter(), &embedder).unwrap();

        assert!(index.split_count() > 1);
        assert_eq!(index.chunk_count(), 1);
        assert_eq!(
            index.splits_of_chunk("long").unwrap().len(),
            index.split_count()
        );

        // Chunk-level search still reports one result
        let results = index.search_chunks("mammals", 5, &embedder).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "long");
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let embedder = HashEmbedder::new(64);
        let index = VectorIndex::build(&corpus(), &splitter(), &embedder).unwrap();

        let other = HashEmbedder::new(128);
        let err = index.search("query", 3, &other).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Embedding(EmbeddingError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_k_zero_returns_empty() {
        let embedder = HashEmbedder::new(64);
        let index = VectorIndex::build(&corpus(), &splitter(), &embedder).unwrap();
        assert!(index.search("mammals", 0, &embedder).unwrap().is_empty());
    }
}
