//! Bounded-depth traversal of the source graph
//!
//! Locates chunks by keyword containment and scores them by traversal
//! distance from the nearest seed: `1 / (depth + 1)`.

use super::GraphStore;
use crate::error::Result;
use crate::types::{ChunkId, RetrievedChunk};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Policy for picking the lexical match term out of a query
///
/// Kept as a seam on purpose: the default longest-token heuristic is a
/// known simplification, and multi-term strategies slot in here without
/// touching the traversal.
pub trait TermSelector: Send + Sync + Debug {
    /// Extract the match term; `None` when the query has no word tokens
    fn select(&self, query: &str) -> Option<String>;
}

/// Default policy: longest word token, lowercased; ties broken by first
/// occurrence.
#[derive(Debug, Clone, Default)]
pub struct LongestToken;

impl TermSelector for LongestToken {
    fn select(&self, query: &str) -> Option<String> {
        let mut best: Option<&str> = None;
        for token in query.unicode_words() {
            match best {
                Some(b) if token.chars().count() <= b.chars().count() => {}
                _ => best = Some(token),
            }
        }
        best.map(|t| t.to_lowercase())
    }
}

/// Graph-relationship retrieval over a [`GraphStore`]
#[derive(Clone)]
pub struct GraphWalker {
    store: Arc<dyn GraphStore>,
    term_selector: Arc<dyn TermSelector>,
}

impl GraphWalker {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            term_selector: Arc::new(LongestToken),
        }
    }

    pub fn with_term_selector(mut self, selector: Arc<dyn TermSelector>) -> Self {
        self.term_selector = selector;
        self
    }

    /// Walk the source graph from `seeds` up to `max_depth` hops, or scan
    /// all chunks when no seeds are given.
    ///
    /// Edges are followed in either direction. Traversal is cycle-safe:
    /// each node is recorded at its shallowest discovered depth only, so
    /// the walk terminates on any graph. Results are ordered by depth,
    /// then chunk id, for reproducibility.
    pub fn walk(
        &self,
        query: &str,
        seeds: Option<&[String]>,
        max_depth: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let term = self
            .term_selector
            .select(query)
            .unwrap_or_else(|| query.trim().to_lowercase());

        if term.is_empty() {
            return Ok(Vec::new());
        }

        match seeds {
            Some(seeds) if !seeds.is_empty() => self.seeded_walk(&term, seeds, max_depth),
            _ => self.global_scan(&term),
        }
    }

    fn seeded_walk(
        &self,
        term: &str,
        seeds: &[String],
        max_depth: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        // Multi-source BFS; shallowest depth wins, so `depth` is the
        // hop count from the nearest seed.
        let mut visited: HashMap<String, usize> = HashMap::new();
        let mut parent: HashMap<String, String> = HashMap::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();

        for seed in seeds {
            if self.store.source(seed)?.is_none() {
                debug!("seed not in graph, skipping: {}", seed);
                continue;
            }
            if !visited.contains_key(seed) {
                visited.insert(seed.clone(), 0);
                queue.push_back((seed.clone(), 0));
            }
        }

        let mut results: Vec<(usize, RetrievedChunk)> = Vec::new();

        while let Some((url, depth)) = queue.pop_front() {
            self.collect_matches(&url, depth, term, &parent, &mut results)?;

            if depth >= max_depth {
                continue;
            }
            for neighbor in self.store.neighbors(&url)? {
                if !visited.contains_key(&neighbor) {
                    visited.insert(neighbor.clone(), depth + 1);
                    parent.insert(neighbor.clone(), url.clone());
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        results.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.chunk_id.cmp(&b.1.chunk_id)));
        debug!(
            "graph walk for '{}': {} nodes visited, {} results",
            term,
            visited.len(),
            results.len()
        );
        Ok(results.into_iter().map(|(_, chunk)| chunk).collect())
    }

    /// Collect the chunks of one visited node that match the term in
    /// their text or in the node's title.
    fn collect_matches(
        &self,
        url: &str,
        depth: usize,
        term: &str,
        parent: &HashMap<String, String>,
        results: &mut Vec<(usize, RetrievedChunk)>,
    ) -> Result<()> {
        let Some(info) = self.store.source(url)? else {
            return Ok(());
        };
        let title_matches = info
            .title
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(term));

        for chunk in self.store.chunks_of(url)? {
            if !title_matches && !chunk.text.to_lowercase().contains(term) {
                continue;
            }
            results.push((
                depth,
                RetrievedChunk {
                    chunk_id: chunk.id,
                    text: chunk.text,
                    modality: chunk.modality,
                    score: 1.0 / (depth as f32 + 1.0),
                    source_url: info.url.clone(),
                    source_type: info.kind,
                    source_title: info.title.clone(),
                    context_path: Some(reconstruct_path(url, parent)),
                    related_assets: None,
                },
            ));
        }
        Ok(())
    }

    /// Scan all chunks for the term; every match scores 1.0, no breadcrumb.
    fn global_scan(&self, term: &str) -> Result<Vec<RetrievedChunk>> {
        let chunks = self.store.all_chunks()?;
        let matching: Vec<_> = chunks
            .into_iter()
            .filter(|c| c.text.to_lowercase().contains(term))
            .collect();

        let ids: Vec<ChunkId> = matching.iter().map(|c| c.id.clone()).collect();
        let sources = self.store.sources_for(&ids)?;

        let mut results: Vec<RetrievedChunk> = matching
            .into_iter()
            .filter_map(|chunk| {
                // No owning source means no provenance; excluded
                let info = sources.get(&chunk.id)?;
                Some(RetrievedChunk {
                    chunk_id: chunk.id,
                    text: chunk.text,
                    modality: chunk.modality,
                    score: 1.0,
                    source_url: info.url.clone(),
                    source_type: info.kind,
                    source_title: info.title.clone(),
                    context_path: None,
                    related_assets: None,
                })
            })
            .collect();

        results.sort_by(|a, b| a.chunk_id.cmp(&b.chunk_id));
        debug!("global scan for '{}': {} results", term, results.len());
        Ok(results)
    }
}

/// Rebuild the seed-to-node URL breadcrumb from BFS parent pointers
fn reconstruct_path(url: &str, parent: &HashMap<String, String>) -> Vec<String> {
    let mut path = vec![url.to_string()];
    let mut current = url;
    let mut hops = HashSet::new();
    while let Some(prev) = parent.get(current) {
        // Parent pointers cannot cycle by construction; the guard keeps a
        // malformed map from looping forever
        if !hops.insert(prev.clone()) {
            break;
        }
        path.push(prev.clone());
        current = prev;
    }
    path.reverse();
    path
}
