//! owlgraph: hybrid retrieval over a chunked, interlinked document corpus
//!
//! Combines two complementary retrieval strategies over one corpus:
//!
//! - **Semantic**: exact cosine search over embedded text splits in a
//!   flat inner-product [`index::VectorIndex`], resolved back to chunk
//!   granularity.
//! - **Structural**: breadth-first [`graph::GraphWalker`] traversal of
//!   the page/asset link graph, scoring matches by hop distance and
//!   recording the breadcrumb that led to each one.
//!
//! [`retrieval::KnowledgeRetriever`] is the single entry point: it owns
//! the index lifecycle (build, persist, load), dispatches the four
//! search modes, fuses the hybrid legs with configurable weights, and
//! enriches page results with their contained assets. A persisted
//! snapshot can be reopened fully offline with
//! [`retrieval::KnowledgeRetriever::open_snapshot`].
//!
//! ```no_run
//! use owlgraph::{Chunk, Config, KnowledgeRetriever, SearchMode, SearchOptions, SourceGraph};
//! use owlgraph::embedding::HashEmbedder;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> owlgraph::Result<()> {
//! let mut graph = SourceGraph::new();
//! graph.add_page("https://docs.example/intro", Some("Intro"), 1200);
//! graph.attach_chunk(
//!     "https://docs.example/intro",
//!     Chunk::new("intro-0", "retrieval combines dense and structural signals"),
//! )?;
//!
//! let config = Config::default();
//! let retriever = KnowledgeRetriever::new(
//!     Arc::new(graph),
//!     Arc::new(HashEmbedder::new(config.embedding.dimensions)),
//!     &config,
//! );
//! retriever.build_index()?;
//!
//! let results = retriever
//!     .search("structural signals", SearchMode::Hybrid, &SearchOptions::default())
//!     .await?;
//! println!("{}", owlgraph::retrieval::render_for_llm(&results));
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod index;
pub mod retrieval;
pub mod types;
pub mod util;

pub use config::Config;
pub use error::{Result, RetrievalError};
pub use graph::{GraphStore, GraphWalker, SourceGraph};
pub use index::{SnapshotStats, SnapshotStore, VectorIndex};
pub use retrieval::KnowledgeRetriever;
pub use types::{
    Chunk, ChunkId, RetrievedChunk, SearchMode, SearchOptions, SourceInfo, SourceKind,
};
