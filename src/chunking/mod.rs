//! Deterministic text splitting for embedding

mod splitter;

pub use splitter::TextSplitter;
