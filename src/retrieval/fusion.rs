//! Weighted fusion of semantic and graph result sets
//!
//! Combined score for a chunk is
//! `semantic_weight * semantic_score + graph_weight * graph_score`,
//! with a missing side contributing zero. Weights are not required to
//! sum to 1; callers normalize if they want a bounded scale.

use crate::types::{ChunkId, RetrievedChunk};
use std::collections::HashMap;
use tracing::debug;

/// Merge two result sets into one ranked, deduplicated list.
///
/// A chunk present in both sets is merged once; its `context_path` is
/// preserved from whichever side carries one, the graph side taking
/// precedence (semantic results never produce a path). Output is sorted
/// by combined score descending, ties broken by chunk id so identical
/// inputs always produce identical output, then truncated to `top_k`.
pub fn fuse(
    semantic: Vec<RetrievedChunk>,
    graph: Vec<RetrievedChunk>,
    semantic_weight: f32,
    graph_weight: f32,
    top_k: usize,
) -> Vec<RetrievedChunk> {
    let mut combined: HashMap<ChunkId, f32> = HashMap::new();
    let mut merged: HashMap<ChunkId, RetrievedChunk> = HashMap::new();

    for chunk in semantic {
        *combined.entry(chunk.chunk_id.clone()).or_default() += semantic_weight * chunk.score;
        merged.entry(chunk.chunk_id.clone()).or_insert(chunk);
    }

    for chunk in graph {
        *combined.entry(chunk.chunk_id.clone()).or_default() += graph_weight * chunk.score;
        match merged.entry(chunk.chunk_id.clone()) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                if chunk.context_path.is_some() {
                    entry.get_mut().context_path = chunk.context_path;
                }
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(chunk);
            }
        }
    }

    let mut scored: Vec<(ChunkId, f32)> = combined.into_iter().collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(top_k);

    debug!("fused {} distinct chunks", scored.len());

    scored
        .into_iter()
        .filter_map(|(chunk_id, score)| {
            let mut chunk = merged.remove(&chunk_id)?;
            chunk.score = score;
            Some(chunk)
        })
        .collect()
}
