//! Unified retrieval facade
//!
//! One entry point over the vector index, the graph walker, weighted
//! fusion, and asset enrichment. The facade owns the index behind a
//! read-write lock: `None` until [`KnowledgeRetriever::build_index`] or
//! [`KnowledgeRetriever::load_index`] succeeds, and every search path
//! that needs vectors reports [`RetrievalError::IndexNotBuilt`] before
//! then. Graph-walk searches work without an index.

use crate::chunking::TextSplitter;
use crate::config::Config;
use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};
use crate::graph::{GraphStore, GraphWalker};
use crate::index::{load_snapshot, persist_snapshot, VectorIndex};
use crate::retrieval::{fuse, ContextEnricher};
use crate::types::{ChunkId, RetrievedChunk, SearchMode, SearchOptions, SourceKind, DEFAULT_MODALITY};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Hybrid retrieval engine over one chunk/graph source
pub struct KnowledgeRetriever {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    splitter: TextSplitter,
    config: RetrievalConfig,
    walker: GraphWalker,
    enricher: ContextEnricher,
    index: RwLock<Option<Arc<VectorIndex>>>,
}

impl KnowledgeRetriever {
    /// Create a retriever over a live graph source. No index exists yet;
    /// call [`build_index`](Self::build_index) before semantic search.
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &Config,
    ) -> Self {
        Self {
            walker: GraphWalker::new(Arc::clone(&store)),
            enricher: ContextEnricher::new(Arc::clone(&store), config.retrieval.related_assets_cap),
            splitter: TextSplitter::new(&config.splitter),
            config: config.retrieval.clone(),
            store,
            embedder,
            index: RwLock::new(None),
        }
    }

    /// Open a persisted snapshot as a fully offline retriever.
    ///
    /// Semantic search and the global keyword scan work with no live
    /// graph source; seeded walks and enrichment degrade because the
    /// snapshot carries no edges.
    pub fn open_snapshot(
        dir: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &Config,
    ) -> Result<Self> {
        let (index, snapshot) = load_snapshot(dir)?;
        let store: Arc<dyn GraphStore> = Arc::new(snapshot);
        let retriever = Self::new(store, embedder, config);
        *retriever.index.write() = Some(Arc::new(index));
        Ok(retriever)
    }

    /// Build the vector index from every chunk the store currently holds.
    ///
    /// Replaces any previously built index atomically; searches running
    /// against the old index finish on their own handle.
    #[instrument(skip(self))]
    pub fn build_index(&self) -> Result<()> {
        let chunks = self.store.all_chunks()?;
        let index = VectorIndex::build(&chunks, &self.splitter, self.embedder.as_ref())?;
        info!(
            splits = index.split_count(),
            chunks = index.chunk_count(),
            "vector index built"
        );
        *self.index.write() = Some(Arc::new(index));
        Ok(())
    }

    /// Persist the built index and the store's metadata to `dir`
    pub fn persist_index(&self, dir: impl AsRef<Path>) -> Result<()> {
        let index = self.index_handle()?;
        persist_snapshot(&index, self.store.as_ref(), dir)
    }

    /// Install the index from a snapshot directory, keeping the current
    /// graph source for provenance and traversal
    pub fn load_index(&self, dir: impl AsRef<Path>) -> Result<()> {
        let (index, _) = load_snapshot(dir)?;
        *self.index.write() = Some(Arc::new(index));
        Ok(())
    }

    pub fn is_index_built(&self) -> bool {
        self.index.read().is_some()
    }

    fn index_handle(&self) -> Result<Arc<VectorIndex>> {
        self.index
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(RetrievalError::IndexNotBuilt)
    }

    /// Run one search in the given mode.
    ///
    /// An empty or whitespace-only query returns no results in every
    /// mode. Hybrid mode runs its two legs on blocking worker threads
    /// and joins them; the other modes run inline.
    #[instrument(
        skip_all,
        fields(query = %crate::util::truncate_str(query, 80), mode = %mode, top_k = options.top_k)
    )]
    pub async fn search(
        &self,
        query: &str,
        mode: SearchMode,
        options: &SearchOptions,
    ) -> Result<Vec<RetrievedChunk>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        match mode {
            SearchMode::Semantic => self.semantic(query, options.top_k),
            SearchMode::GraphWalk => {
                self.walker
                    .walk(query, options.seed_urls.as_deref(), options.max_depth)
            }
            SearchMode::Multimodal => {
                let mut results = self.semantic(query, options.top_k)?;
                if options.include_assets {
                    self.enricher.enrich(&mut results);
                }
                Ok(results)
            }
            SearchMode::Hybrid => self.hybrid(query, options).await,
        }
    }

    fn semantic(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let index = self.index_handle()?;
        semantic_results(
            index.as_ref(),
            self.embedder.as_ref(),
            self.store.as_ref(),
            query,
            k,
        )
    }

    /// Both legs run concurrently; their scores are fused with the
    /// per-query weights. The semantic leg over-fetches so fusion has
    /// candidates beyond the final cut.
    async fn hybrid(&self, query: &str, options: &SearchOptions) -> Result<Vec<RetrievedChunk>> {
        let index = self.index_handle()?;
        let candidates = options
            .top_k
            .saturating_mul(self.config.candidate_multiplier)
            .max(options.top_k);

        let embedder = Arc::clone(&self.embedder);
        let store = Arc::clone(&self.store);
        let sem_query = query.to_string();
        let semantic_leg = tokio::task::spawn_blocking(move || {
            semantic_results(
                index.as_ref(),
                embedder.as_ref(),
                store.as_ref(),
                &sem_query,
                candidates,
            )
        });

        let walker = self.walker.clone();
        let walk_query = query.to_string();
        let seeds = options.seed_urls.clone();
        let max_depth = options.max_depth;
        let graph_leg = tokio::task::spawn_blocking(move || {
            walker.walk(&walk_query, seeds.as_deref(), max_depth)
        });

        let (semantic, graph) = tokio::join!(semantic_leg, graph_leg);
        let semantic = semantic.map_err(|e| RetrievalError::Task(e.to_string()))??;
        let graph = graph.map_err(|e| RetrievalError::Task(e.to_string()))??;

        debug!(
            semantic = semantic.len(),
            graph = graph.len(),
            "fusing hybrid legs"
        );
        Ok(fuse(
            semantic,
            graph,
            options.semantic_weight,
            options.graph_weight,
            options.top_k,
        ))
    }
}

/// Resolve chunk-granularity index hits into full results with
/// provenance. Chunks whose owning source is unknown are dropped rather
/// than surfaced without attribution.
fn semantic_results(
    index: &VectorIndex,
    embedder: &dyn EmbeddingProvider,
    store: &dyn GraphStore,
    query: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>> {
    let scored = index.search_chunks(query, k, embedder)?;
    let ids: Vec<ChunkId> = scored.iter().map(|(id, _)| id.clone()).collect();
    let sources = store.sources_for(&ids)?;

    let mut results = Vec::with_capacity(scored.len());
    for (chunk_id, score) in scored {
        let Some(source) = sources.get(&chunk_id) else {
            debug!("dropping chunk with no owning source: {}", chunk_id);
            continue;
        };
        let Some(chunk) = store.chunk(&chunk_id)? else {
            debug!("indexed chunk missing from store: {}", chunk_id);
            continue;
        };
        results.push(RetrievedChunk {
            chunk_id,
            text: chunk.text,
            modality: chunk.modality,
            score,
            source_url: source.url.clone(),
            source_type: source.kind,
            source_title: source.title.clone(),
            context_path: None,
            related_assets: None,
        });
    }
    Ok(results)
}

/// Render results as a markdown context block for prompt assembly.
///
/// Breadcrumbs are shortened to their last three hops and asset lists
/// to their first three entries to keep the block prompt-sized; the
/// chunk text itself is never truncated.
pub fn render_for_llm(results: &[RetrievedChunk]) -> String {
    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("## Source {} (Score: {:.3})\n", i + 1, result.score));
        let kind = match result.source_type {
            SourceKind::Page => "Page",
            SourceKind::Asset => "Asset",
        };
        out.push_str(&format!("**Type:** {}\n", kind));
        out.push_str(&format!("**URL:** {}\n", result.source_url));
        if let Some(title) = &result.source_title {
            out.push_str(&format!("**Title:** {}\n", title));
        }
        if result.modality != DEFAULT_MODALITY {
            out.push_str(&format!("**Modality:** {}\n", result.modality));
        }
        if let Some(path) = &result.context_path {
            let tail = if path.len() > 3 {
                &path[path.len() - 3..]
            } else {
                &path[..]
            };
            out.push_str(&format!("**Path:** {}\n", tail.join(" → ")));
        }
        if let Some(assets) = &result.related_assets {
            if !assets.is_empty() {
                let listed: Vec<String> = assets
                    .iter()
                    .take(3)
                    .map(|a| format!("{} ({})", a.filename, a.kind))
                    .collect();
                out.push_str(&format!("**Related Assets:** {}\n", listed.join(", ")));
            }
        }
        out.push('\n');
        out.push_str(&format!("**Content:** {}\n", result.text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::graph::SourceGraph;
    use crate::types::{AssetRef, Chunk};

    fn sample_graph() -> SourceGraph {
        let mut graph = SourceGraph::new();
        graph
            .add_page("https://cats.example", Some("About Cats"), 100)
            .add_page("https://rust.example", Some("About Rust"), 100)
            .add_asset("https://cats.example/cat.jpg", "cat.jpg", "image")
            .link("https://cats.example", "https://rust.example", None)
            .contain("https://cats.example", "https://cats.example/cat.jpg");
        graph
            .attach_chunk("https://cats.example", Chunk::new("c-cats", "cats are mammals"))
            .unwrap();
        graph
            .attach_chunk(
                "https://rust.example",
                Chunk::new("c-rust", "rust is a systems language"),
            )
            .unwrap();
        graph
    }

    fn retriever() -> KnowledgeRetriever {
        let config = Config::default();
        KnowledgeRetriever::new(
            Arc::new(sample_graph()),
            Arc::new(HashEmbedder::new(128)),
            &config,
        )
    }

    #[tokio::test]
    async fn test_semantic_search_requires_built_index() {
        let r = retriever();
        let err = r
            .search("mammals", SearchMode::Semantic, &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::IndexNotBuilt));
    }

    #[tokio::test]
    async fn test_graph_walk_works_without_index() {
        let r = retriever();
        let results = r
            .search("mammals", SearchMode::GraphWalk, &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, "c-cats");
    }

    #[tokio::test]
    async fn test_semantic_ranks_matching_chunk_first() {
        let r = retriever();
        r.build_index().unwrap();
        let results = r
            .search("mammals", SearchMode::Semantic, &SearchOptions::default())
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk_id, "c-cats");
        assert_eq!(results[0].source_title.as_deref(), Some("About Cats"));
    }

    #[tokio::test]
    async fn test_hybrid_boosts_chunk_found_by_both_legs() {
        let r = retriever();
        r.build_index().unwrap();
        let options =
            SearchOptions::default().with_seeds(vec!["https://cats.example".to_string()]);
        let results = r
            .search("mammals", SearchMode::Hybrid, &options)
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk_id, "c-cats");
    }

    #[tokio::test]
    async fn test_multimodal_attaches_assets() {
        let r = retriever();
        r.build_index().unwrap();
        let results = r
            .search("mammals", SearchMode::Multimodal, &SearchOptions::default())
            .await
            .unwrap();
        let cats = results.iter().find(|c| c.chunk_id == "c-cats").unwrap();
        let assets = cats.related_assets.as_ref().unwrap();
        assert_eq!(assets[0].filename, "cat.jpg");
    }

    #[tokio::test]
    async fn test_empty_query_returns_no_results() {
        let r = retriever();
        r.build_index().unwrap();
        for mode in [
            SearchMode::Semantic,
            SearchMode::GraphWalk,
            SearchMode::Hybrid,
            SearchMode::Multimodal,
        ] {
            let results = r.search("   ", mode, &SearchOptions::default()).await.unwrap();
            assert!(results.is_empty(), "mode {} returned results", mode);
        }
    }

    #[test]
    fn test_render_includes_provenance() {
        let results = vec![RetrievedChunk {
            chunk_id: "c1".to_string(),
            text: "cats are mammals".to_string(),
            modality: "text".to_string(),
            score: 0.78,
            source_url: "https://cats.example".to_string(),
            source_type: SourceKind::Page,
            source_title: Some("About Cats".to_string()),
            context_path: Some(vec![
                "https://seed.example".to_string(),
                "https://cats.example".to_string(),
            ]),
            related_assets: Some(vec![AssetRef {
                url: "https://cats.example/cat.jpg".to_string(),
                kind: "image".to_string(),
                filename: "cat.jpg".to_string(),
            }]),
        }];
        let rendered = render_for_llm(&results);
        assert!(rendered.contains("## Source 1 (Score: 0.780)"));
        assert!(rendered.contains("**Type:** Page"));
        assert!(rendered.contains("**URL:** https://cats.example"));
        assert!(rendered.contains("**Title:** About Cats"));
        assert!(rendered.contains("**Path:** https://seed.example → https://cats.example"));
        assert!(rendered.contains("**Related Assets:** cat.jpg (image)"));
        assert!(rendered.contains("**Content:** cats are mammals"));
        // Default modality is not repeated
        assert!(!rendered.contains("**Modality:**"));
    }

    #[test]
    fn test_render_shortens_long_breadcrumbs() {
        let mut chunk = RetrievedChunk {
            chunk_id: "c1".to_string(),
            text: "t".to_string(),
            modality: "text".to_string(),
            score: 1.0,
            source_url: "https://e.example".to_string(),
            source_type: SourceKind::Page,
            source_title: None,
            context_path: Some(
                (1..=5).map(|i| format!("https://hop{}.example", i)).collect(),
            ),
            related_assets: None,
        };
        let rendered = render_for_llm(std::slice::from_ref(&chunk));
        assert!(rendered.contains(
            "**Path:** https://hop3.example → https://hop4.example → https://hop5.example"
        ));
        assert!(!rendered.contains("hop1"));

        chunk.context_path = None;
        let rendered = render_for_llm(std::slice::from_ref(&chunk));
        assert!(!rendered.contains("**Path:**"));
    }

    #[test]
    fn test_render_empty_results_is_empty_string() {
        assert_eq!(render_for_llm(&[]), "");
    }
}
