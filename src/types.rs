//! Core types for the retrieval engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a chunk
pub type ChunkId = String;

/// Embedding vector type
pub type Embedding = Vec<f32>;

/// Default modality tag for text chunks
pub const DEFAULT_MODALITY: &str = "text";

/// Kind of source node that owns a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Page,
    Asset,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Asset => "asset",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous span of text extracted from one source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    /// Modality tag, e.g. "text" or "image-caption"
    pub modality: String,
}

impl Chunk {
    pub fn new(id: impl Into<ChunkId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            modality: DEFAULT_MODALITY.to_string(),
        }
    }

    /// Mint a chunk with a random id
    pub fn with_random_id(text: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), text)
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = modality.into();
        self
    }
}

/// Denormalized owning-source fields for a chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub url: String,
    /// Page title or asset filename
    pub title: Option<String>,
    pub kind: SourceKind,
}

/// Reference to an asset related to a retrieved chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub url: String,
    pub kind: String,
    pub filename: String,
}

/// A ranked retrieval result at chunk granularity
///
/// Scores from different retrieval modes are not directly comparable;
/// the fusion weights in [`crate::retrieval::fuse`] define how they
/// combine. Higher is more relevant, there is no fixed range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: ChunkId,
    pub text: String,
    pub modality: String,
    pub score: f32,
    pub source_url: String,
    pub source_type: SourceKind,
    pub source_title: Option<String>,
    /// Breadcrumb of source URLs from a traversal seed to this chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_path: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_assets: Option<Vec<AssetRef>>,
}

/// Retrieval mode selected at the facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Semantic,
    GraphWalk,
    Hybrid,
    Multimodal,
}

impl SearchMode {
    /// Parse a mode name; unknown names are an [`UnsupportedMode`] error.
    ///
    /// [`UnsupportedMode`]: crate::error::RetrievalError::UnsupportedMode
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        match s {
            "semantic" => Ok(Self::Semantic),
            "graph_walk" => Ok(Self::GraphWalk),
            "hybrid" => Ok(Self::Hybrid),
            "multimodal" => Ok(Self::Multimodal),
            other => Err(crate::error::RetrievalError::UnsupportedMode(
                other.to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::GraphWalk => "graph_walk",
            Self::Hybrid => "hybrid",
            Self::Multimodal => "multimodal",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-query knobs passed to the facade
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of results to return
    pub top_k: usize,
    /// Traversal seeds for graph-walk and hybrid modes; `None` scans globally
    pub seed_urls: Option<Vec<String>>,
    /// Maximum traversal depth in hops
    pub max_depth: usize,
    /// Weight applied to semantic scores during fusion
    pub semantic_weight: f32,
    /// Weight applied to graph scores during fusion
    pub graph_weight: f32,
    /// Attach related assets in multimodal mode
    pub include_assets: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            seed_urls: None,
            max_depth: 2,
            semantic_weight: 0.7,
            graph_weight: 0.3,
            include_assets: true,
        }
    }
}

impl SearchOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_seeds(mut self, seeds: Vec<String>) -> Self {
        self.seed_urls = Some(seeds);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_weights(mut self, semantic: f32, graph: f32) -> Self {
        self.semantic_weight = semantic;
        self.graph_weight = graph;
        self
    }
}
