//! Source graph: pages, assets, and the structural links between them
//!
//! The graph owns all nodes in an arena keyed by URL; edges are
//! adjacency lists referenced by key. Nothing here holds back-references,
//! so cyclic link structure (ordinary on the web) is representable
//! without ownership knots.

mod walker;

pub use walker::{GraphWalker, LongestToken, TermSelector};

use crate::error::{Result, RetrievalError};
use crate::types::{AssetRef, Chunk, ChunkId, SourceInfo, SourceKind};
use std::collections::HashMap;

/// Kind of directed edge between source nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// Page-to-page hyperlink, optionally carrying anchor text
    LinksTo { anchor: Option<String> },
    /// Page-contains-asset relationship
    Contains,
}

/// A page node: URL-addressable document
#[derive(Debug, Clone)]
pub struct PageNode {
    pub url: String,
    pub title: Option<String>,
    pub content_length: usize,
}

/// An asset node: file contained by a page (image, PDF, ...)
#[derive(Debug, Clone)]
pub struct AssetNode {
    pub url: String,
    pub filename: String,
    pub kind: String,
}

/// A node in the source graph
#[derive(Debug, Clone)]
pub enum SourceNode {
    Page(PageNode),
    Asset(AssetNode),
}

impl SourceNode {
    pub fn url(&self) -> &str {
        match self {
            Self::Page(p) => &p.url,
            Self::Asset(a) => &a.url,
        }
    }

    /// Denormalized provenance fields for this node
    pub fn info(&self) -> SourceInfo {
        match self {
            Self::Page(p) => SourceInfo {
                url: p.url.clone(),
                title: p.title.clone(),
                kind: SourceKind::Page,
            },
            Self::Asset(a) => SourceInfo {
                url: a.url.clone(),
                title: Some(a.filename.clone()),
                kind: SourceKind::Asset,
            },
        }
    }
}

/// Read capabilities the retrieval core requires from a chunk/graph source
///
/// Two implementations exist: the live in-memory [`SourceGraph`] arena
/// and the persisted [`SnapshotStore`] used fully offline. Failures are
/// reported as [`RetrievalError::BackingStore`] and propagate to the
/// caller on primary retrieval paths; only the context enricher treats
/// them as non-fatal.
///
/// [`SnapshotStore`]: crate::index::SnapshotStore
pub trait GraphStore: Send + Sync {
    /// All chunks known to the store
    fn all_chunks(&self) -> Result<Vec<Chunk>>;

    /// Look up a single chunk by id
    fn chunk(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        Ok(self
            .all_chunks()?
            .into_iter()
            .find(|chunk| chunk.id == chunk_id))
    }

    /// Owning-source fields for a set of chunks; chunks without an owning
    /// source are absent from the map
    fn sources_for(&self, chunk_ids: &[ChunkId]) -> Result<HashMap<ChunkId, SourceInfo>>;

    /// Source node fields for a URL, if known
    fn source(&self, url: &str) -> Result<Option<SourceInfo>>;

    /// Chunks owned by the source at `url`
    fn chunks_of(&self, url: &str) -> Result<Vec<Chunk>>;

    /// Neighbor URLs reachable over one LINKS_TO/CONTAINS hop in either
    /// direction, in deterministic order
    fn neighbors(&self, url: &str) -> Result<Vec<String>>;

    /// Assets directly contained by the page at `url`, up to `cap`
    fn contained_assets(&self, page_url: &str, cap: usize) -> Result<Vec<AssetRef>>;
}

/// In-memory source graph arena
///
/// Read-only from the retrieval core's perspective: built once per
/// ingestion pass, then shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct SourceGraph {
    nodes: HashMap<String, SourceNode>,
    out_edges: HashMap<String, Vec<(String, EdgeKind)>>,
    in_edges: HashMap<String, Vec<String>>,
    chunks: HashMap<ChunkId, Chunk>,
    owner: HashMap<ChunkId, String>,
    owned: HashMap<String, Vec<ChunkId>>,
}

impl SourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a page node. Replaces any existing node at the same URL.
    pub fn add_page(
        &mut self,
        url: impl Into<String>,
        title: Option<&str>,
        content_length: usize,
    ) -> &mut Self {
        let url = url.into();
        self.nodes.insert(
            url.clone(),
            SourceNode::Page(PageNode {
                url,
                title: title.map(|t| t.to_string()),
                content_length,
            }),
        );
        self
    }

    /// Insert an asset node. Replaces any existing node at the same URL.
    pub fn add_asset(
        &mut self,
        url: impl Into<String>,
        filename: impl Into<String>,
        kind: impl Into<String>,
    ) -> &mut Self {
        let url = url.into();
        self.nodes.insert(
            url.clone(),
            SourceNode::Asset(AssetNode {
                url,
                filename: filename.into(),
                kind: kind.into(),
            }),
        );
        self
    }

    /// Add a LINKS_TO edge between two pages
    pub fn link(&mut self, from: &str, to: &str, anchor: Option<&str>) -> &mut Self {
        self.add_edge(
            from,
            to,
            EdgeKind::LinksTo {
                anchor: anchor.map(|a| a.to_string()),
            },
        )
    }

    /// Add a CONTAINS edge from a page to an asset
    pub fn contain(&mut self, page: &str, asset: &str) -> &mut Self {
        self.add_edge(page, asset, EdgeKind::Contains)
    }

    fn add_edge(&mut self, from: &str, to: &str, kind: EdgeKind) -> &mut Self {
        self.out_edges
            .entry(from.to_string())
            .or_default()
            .push((to.to_string(), kind));
        self.in_edges
            .entry(to.to_string())
            .or_default()
            .push(from.to_string());
        self
    }

    /// Attach a chunk to its owning source. Every chunk has exactly one
    /// owner; attaching to an unknown URL is an ingestion error.
    pub fn attach_chunk(&mut self, url: &str, chunk: Chunk) -> Result<()> {
        if !self.nodes.contains_key(url) {
            return Err(RetrievalError::backing_store(anyhow::anyhow!(
                "cannot attach chunk {} to unknown source {}",
                chunk.id,
                url
            )));
        }
        self.owner.insert(chunk.id.clone(), url.to_string());
        self.owned
            .entry(url.to_string())
            .or_default()
            .push(chunk.id.clone());
        self.chunks.insert(chunk.id.clone(), chunk);
        Ok(())
    }

    pub fn node(&self, url: &str) -> Option<&SourceNode> {
        self.nodes.get(url)
    }

    /// Outgoing edges of a node, with their kind (and anchor text for links)
    pub fn edges_from(&self, url: &str) -> &[(String, EdgeKind)] {
        self.out_edges.get(url).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl GraphStore for SourceGraph {
    fn all_chunks(&self) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self.chunks.values().cloned().collect();
        chunks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(chunks)
    }

    fn chunk(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        Ok(self.chunks.get(chunk_id).cloned())
    }

    fn sources_for(&self, chunk_ids: &[ChunkId]) -> Result<HashMap<ChunkId, SourceInfo>> {
        let mut map = HashMap::new();
        for chunk_id in chunk_ids {
            if let Some(url) = self.owner.get(chunk_id) {
                if let Some(node) = self.nodes.get(url) {
                    map.insert(chunk_id.clone(), node.info());
                }
            }
        }
        Ok(map)
    }

    fn source(&self, url: &str) -> Result<Option<SourceInfo>> {
        Ok(self.nodes.get(url).map(|n| n.info()))
    }

    fn chunks_of(&self, url: &str) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self
            .owned
            .get(url)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.chunks.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        chunks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(chunks)
    }

    fn neighbors(&self, url: &str) -> Result<Vec<String>> {
        // Undirected: outgoing targets first, then incoming sources,
        // deduplicated preserving insertion order
        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::new();

        if let Some(out) = self.out_edges.get(url) {
            for (to, _) in out {
                if seen.insert(to.clone()) {
                    result.push(to.clone());
                }
            }
        }
        if let Some(inc) = self.in_edges.get(url) {
            for from in inc {
                if seen.insert(from.clone()) {
                    result.push(from.clone());
                }
            }
        }
        Ok(result)
    }

    fn contained_assets(&self, page_url: &str, cap: usize) -> Result<Vec<AssetRef>> {
        let mut assets = Vec::new();
        if let Some(out) = self.out_edges.get(page_url) {
            for (to, kind) in out {
                if *kind != EdgeKind::Contains {
                    continue;
                }
                if let Some(SourceNode::Asset(asset)) = self.nodes.get(to) {
                    assets.push(AssetRef {
                        url: asset.url.clone(),
                        kind: asset.kind.clone(),
                        filename: asset.filename.clone(),
                    });
                    if assets.len() >= cap {
                        break;
                    }
                }
            }
        }
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> SourceGraph {
        let mut graph = SourceGraph::new();
        graph
            .add_page("https://a.example", Some("Page A"), 1000)
            .add_page("https://b.example", Some("Page B"), 500)
            .add_asset("https://a.example/logo.png", "logo.png", "image")
            .link("https://a.example", "https://b.example", Some("see b"))
            .contain("https://a.example", "https://a.example/logo.png");
        graph
            .attach_chunk("https://a.example", Chunk::new("c-a", "alpha text"))
            .unwrap();
        graph
            .attach_chunk("https://b.example", Chunk::new("c-b", "bravo text"))
            .unwrap();
        graph
    }

    #[test]
    fn test_attach_chunk_requires_known_source() {
        let mut graph = SourceGraph::new();
        let err = graph.attach_chunk("https://nope", Chunk::new("c1", "text"));
        assert!(err.is_err());
    }

    #[test]
    fn test_neighbors_are_undirected() {
        let graph = sample_graph();
        // Outgoing from A
        let a_neighbors = graph.neighbors("https://a.example").unwrap();
        assert!(a_neighbors.contains(&"https://b.example".to_string()));
        assert!(a_neighbors.contains(&"https://a.example/logo.png".to_string()));
        // Incoming edge is crossed from B's side too
        let b_neighbors = graph.neighbors("https://b.example").unwrap();
        assert_eq!(b_neighbors, vec!["https://a.example".to_string()]);
    }

    #[test]
    fn test_sources_for_skips_orphans() {
        let graph = sample_graph();
        let map = graph
            .sources_for(&["c-a".to_string(), "missing".to_string()])
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["c-a"].kind, SourceKind::Page);
        assert_eq!(map["c-a"].title.as_deref(), Some("Page A"));
    }

    #[test]
    fn test_asset_info_title_is_filename() {
        let graph = sample_graph();
        let info = graph.source("https://a.example/logo.png").unwrap().unwrap();
        assert_eq!(info.kind, SourceKind::Asset);
        assert_eq!(info.title.as_deref(), Some("logo.png"));
    }

    #[test]
    fn test_link_anchor_text_round_trips() {
        let graph = sample_graph();
        let edges = graph.edges_from("https://a.example");
        let anchor = edges.iter().find_map(|(to, kind)| match kind {
            EdgeKind::LinksTo { anchor } if to == "https://b.example" => anchor.as_deref(),
            _ => None,
        });
        assert_eq!(anchor, Some("see b"));
    }

    #[test]
    fn test_contained_assets_respects_cap() {
        let mut graph = SourceGraph::new();
        graph.add_page("https://p.example", Some("P"), 0);
        for i in 0..8 {
            let url = format!("https://p.example/a{}.png", i);
            graph.add_asset(&url, format!("a{}.png", i), "image");
            graph.contain("https://p.example", &url);
        }
        let assets = graph.contained_assets("https://p.example", 5).unwrap();
        assert_eq!(assets.len(), 5);
    }

    #[test]
    fn test_all_chunks_sorted_by_id() {
        let graph = sample_graph();
        let chunks = graph.all_chunks().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "c-a");
        assert_eq!(chunks[1].id, "c-b");
    }
}
