//! Embedding providers
//!
//! The retrieval core never owns a global model instance; every
//! operation takes an explicit [`EmbeddingProvider`] handle so multiple
//! models can coexist in one process.

mod hash;
mod provider;

pub use hash::HashEmbedder;
pub use provider::{EmbeddingError, EmbeddingProvider, EmbeddingResult};

pub(crate) use provider::normalize_vector;
