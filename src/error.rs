//! Error taxonomy for the retrieval core
//!
//! Empty result lists are never errors; every variant here means the
//! search itself could not be carried out.

use crate::embedding::EmbeddingError;

/// Errors surfaced to callers of the retrieval facade
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Search attempted before the vector index was built or loaded
    #[error("vector index not built; call build_index() or load_index() first")]
    IndexNotBuilt,

    /// Index build attempted over a corpus with no usable text
    #[error("no usable text in corpus; nothing to index")]
    EmptyCorpus,

    /// Persisted index artifacts disagree with each other; load fails closed
    #[error("corrupt index artifacts: {0}")]
    CorruptIndex(String),

    /// The external chunk/graph source is unreachable or returned malformed data
    #[error("backing store error: {0}")]
    BackingStore(#[source] anyhow::Error),

    /// Unknown search mode requested
    #[error("unsupported search mode: {0}")]
    UnsupportedMode(String),

    /// Embedding provider failure
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Filesystem failure while persisting or loading index artifacts
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A spawned retrieval task did not run to completion
    #[error("retrieval task failed: {0}")]
    Task(String),
}

impl RetrievalError {
    /// Wrap an arbitrary backing-store failure
    pub fn backing_store(err: impl Into<anyhow::Error>) -> Self {
        Self::BackingStore(err.into())
    }
}

/// Result type for retrieval operations
pub type Result<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_remedy() {
        let err = RetrievalError::IndexNotBuilt;
        assert!(err.to_string().contains("build_index"));

        let err = RetrievalError::UnsupportedMode("psychic".to_string());
        assert!(err.to_string().contains("psychic"));
    }

    #[test]
    fn test_backing_store_wraps_source() {
        let err = RetrievalError::backing_store(anyhow::anyhow!("connection refused"));
        assert!(err.to_string().contains("connection refused"));
    }
}
