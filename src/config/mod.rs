//! Configuration for the retrieval engine

mod logging;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Text splitter configuration
    #[serde(default)]
    pub splitter: SplitterConfig,
    /// Retrieval and fusion configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model identifier; the persisted index records it for load-time checks
    pub model_id: String,
    /// Embedding dimensions
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
        }
    }
}

/// Text splitter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Maximum split size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive splits in characters
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Retrieval and fusion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of results returned by the facade
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Default traversal depth for graph walks
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Weight applied to semantic scores during fusion
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,
    /// Weight applied to graph scores during fusion
    #[serde(default = "default_graph_weight")]
    pub graph_weight: f32,
    /// Semantic candidates fetched per requested result in hybrid mode
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
    /// Maximum related assets attached per result during enrichment
    #[serde(default = "default_related_assets_cap")]
    pub related_assets_cap: usize,
}

fn default_top_k() -> usize {
    10
}

fn default_max_depth() -> usize {
    2
}

fn default_semantic_weight() -> f32 {
    0.7
}

fn default_graph_weight() -> f32 {
    0.3
}

fn default_candidate_multiplier() -> usize {
    2
}

fn default_related_assets_cap() -> usize {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_depth: default_max_depth(),
            semantic_weight: default_semantic_weight(),
            graph_weight: default_graph_weight(),
            candidate_multiplier: default_candidate_multiplier(),
            related_assets_cap: default_related_assets_cap(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass rather than playing whack-a-mole.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.embedding.dimensions == 0 {
            errors.push("embedding dimensions must be positive".to_string());
        }
        if self.embedding.dimensions > 4096 {
            errors.push("embedding dimensions must be <= 4096".to_string());
        }
        if self.embedding.model_id.trim().is_empty() {
            errors.push("embedding model_id must not be empty".to_string());
        }

        if self.splitter.chunk_size == 0 {
            errors.push("chunk_size must be positive".to_string());
        }
        if self.splitter.chunk_overlap >= self.splitter.chunk_size {
            errors.push("chunk_overlap must be less than chunk_size".to_string());
        }

        if self.retrieval.top_k == 0 {
            errors.push("top_k must be positive".to_string());
        }
        if self.retrieval.candidate_multiplier == 0 {
            errors.push("candidate_multiplier must be positive".to_string());
        }
        if self.retrieval.semantic_weight < 0.0 {
            errors.push("semantic_weight must be non-negative".to_string());
        }
        if self.retrieval.graph_weight < 0.0 {
            errors.push("graph_weight must be non-negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.embedding.dimensions = 0;
        config.splitter.chunk_size = 0;
        config.retrieval.top_k = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("dimensions"));
        assert!(err.contains("chunk_size"));
        assert!(err.contains("top_k"));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut config = Config::default();
        config.splitter.chunk_overlap = config.splitter.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[embedding]
model_id = "test-model"
dimensions = 64

[splitter]
chunk_size = 200
chunk_overlap = 20

[retrieval]
top_k = 5
semantic_weight = 0.6
graph_weight = 0.4
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.embedding.model_id, "test-model");
        assert_eq!(config.embedding.dimensions, 64);
        assert_eq!(config.splitter.chunk_size, 200);
        assert_eq!(config.retrieval.top_k, 5);
        // Unspecified fields fall back to defaults
        assert_eq!(config.retrieval.max_depth, 2);
    }
}
