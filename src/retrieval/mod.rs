//! Retrieval pipeline: fusion, enrichment, and the unified facade

mod enrich;
mod fusion;
mod retriever;

pub use enrich::ContextEnricher;
pub use fusion::fuse;
pub use retriever::{render_for_llm, KnowledgeRetriever};
