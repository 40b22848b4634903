//! Persisted index snapshot
//!
//! Four artifacts live in a snapshot directory and must agree with each
//! other on record counts before a load succeeds:
//!
//! - `vectors.bin`: bincode blob of the normalized split vectors
//! - `mappings.json`: split-index <-> chunk-id double mapping
//! - `chunks.sled`: denormalized chunk/source metadata records
//! - `config.json`: manifest with model id, dimensions, and counts
//!
//! A loaded snapshot is fully self-contained: semantic search and the
//! global keyword scan work with no access to the original graph
//! source. Traversal capabilities are absent by construction (the
//! snapshot carries no edges) and report a backing-store error.

use super::vector::VectorIndex;
use crate::error::{Result, RetrievalError};
use crate::graph::GraphStore;
use crate::types::{AssetRef, Chunk, ChunkId, SourceInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const VECTORS_FILE: &str = "vectors.bin";
const MAPPINGS_FILE: &str = "mappings.json";
const MANIFEST_FILE: &str = "config.json";
const CHUNKS_DB: &str = "chunks.sled";

#[derive(Debug, Serialize, Deserialize)]
struct SavedVectors {
    dimensions: usize,
    data: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedMappings {
    split_to_chunk: Vec<ChunkId>,
    chunk_to_splits: HashMap<ChunkId, Vec<usize>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    model_id: String,
    dimensions: usize,
    split_count: usize,
    total_chunks: usize,
    built_at: DateTime<Utc>,
}

/// One denormalized metadata record per chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChunkRecord {
    chunk_id: ChunkId,
    text: String,
    modality: String,
    source: Option<SourceInfo>,
}

/// Write the four snapshot artifacts for an index plus the metadata of
/// the store it was built from.
pub fn persist_snapshot(
    index: &VectorIndex,
    store: &dyn GraphStore,
    dir: impl AsRef<Path>,
) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    // 1. Vector blob
    let vectors = SavedVectors {
        dimensions: index.dimensions(),
        data: index.vectors().to_vec(),
    };
    let blob = bincode::serialize(&vectors)
        .map_err(|e| RetrievalError::CorruptIndex(format!("failed to encode vectors: {}", e)))?;
    std::fs::write(dir.join(VECTORS_FILE), blob)?;

    // 2. Mappings
    let mappings = SavedMappings {
        split_to_chunk: index.split_to_chunk().to_vec(),
        chunk_to_splits: index.chunk_to_splits().clone(),
    };
    let json = serde_json::to_vec_pretty(&mappings)
        .map_err(|e| RetrievalError::CorruptIndex(format!("failed to encode mappings: {}", e)))?;
    std::fs::write(dir.join(MAPPINGS_FILE), json)?;

    // 3. Chunk/source metadata records
    let chunks = store.all_chunks()?;
    let ids: Vec<ChunkId> = chunks.iter().map(|c| c.id.clone()).collect();
    let mut sources = store.sources_for(&ids)?;

    let db = sled::open(dir.join(CHUNKS_DB))
        .map_err(|e| RetrievalError::backing_store(anyhow::anyhow!(e)))?;
    let mut total_chunks = 0usize;
    for chunk in chunks {
        let record = ChunkRecord {
            chunk_id: chunk.id.clone(),
            text: chunk.text,
            modality: chunk.modality,
            source: sources.remove(&chunk.id),
        };
        let bytes = bincode::serialize(&record).map_err(|e| {
            RetrievalError::CorruptIndex(format!("failed to encode chunk record: {}", e))
        })?;
        db.insert(record.chunk_id.as_bytes(), bytes)
            .map_err(|e| RetrievalError::backing_store(anyhow::anyhow!(e)))?;
        total_chunks += 1;
    }
    db.flush()
        .map_err(|e| RetrievalError::backing_store(anyhow::anyhow!(e)))?;
    drop(db);

    // 4. Manifest, written last so a partial snapshot never validates
    let manifest = Manifest {
        model_id: index.model_id().to_string(),
        dimensions: index.dimensions(),
        split_count: index.split_count(),
        total_chunks,
        built_at: Utc::now(),
    };
    let json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| RetrievalError::CorruptIndex(format!("failed to encode manifest: {}", e)))?;
    std::fs::write(dir.join(MANIFEST_FILE), json)?;

    info!(
        "persisted snapshot to {}: {} splits, {} chunks",
        dir.display(),
        manifest.split_count,
        manifest.total_chunks
    );
    Ok(())
}

/// Load a snapshot, validating that the artifacts agree on counts.
///
/// Fails closed with [`RetrievalError::CorruptIndex`] on any mismatch;
/// no partial load is ever returned.
pub fn load_snapshot(dir: impl AsRef<Path>) -> Result<(VectorIndex, SnapshotStore)> {
    let dir = dir.as_ref();

    let manifest: Manifest = serde_json::from_slice(&std::fs::read(dir.join(MANIFEST_FILE))?)
        .map_err(|e| RetrievalError::CorruptIndex(format!("unreadable manifest: {}", e)))?;

    let vectors: SavedVectors = bincode::deserialize(&std::fs::read(dir.join(VECTORS_FILE))?)
        .map_err(|e| RetrievalError::CorruptIndex(format!("unreadable vector blob: {}", e)))?;

    let mappings: SavedMappings = serde_json::from_slice(&std::fs::read(dir.join(MAPPINGS_FILE))?)
        .map_err(|e| RetrievalError::CorruptIndex(format!("unreadable mappings: {}", e)))?;

    // Cross-validate all counts before touching anything else
    if vectors.dimensions != manifest.dimensions {
        return Err(RetrievalError::CorruptIndex(format!(
            "vector blob has {} dimensions, manifest says {}",
            vectors.dimensions, manifest.dimensions
        )));
    }
    if vectors.dimensions == 0 || vectors.data.len() % vectors.dimensions != 0 {
        return Err(RetrievalError::CorruptIndex(
            "vector blob length is not a multiple of the dimension".to_string(),
        ));
    }
    let blob_splits = vectors.data.len() / vectors.dimensions;
    if blob_splits != manifest.split_count {
        return Err(RetrievalError::CorruptIndex(format!(
            "vector blob has {} splits, manifest says {}",
            blob_splits, manifest.split_count
        )));
    }
    if mappings.split_to_chunk.len() != manifest.split_count {
        return Err(RetrievalError::CorruptIndex(format!(
            "mappings cover {} splits, manifest says {}",
            mappings.split_to_chunk.len(),
            manifest.split_count
        )));
    }

    let db = sled::open(dir.join(CHUNKS_DB))
        .map_err(|e| RetrievalError::backing_store(anyhow::anyhow!(e)))?;
    let record_count = db.len();
    if record_count != manifest.total_chunks {
        return Err(RetrievalError::CorruptIndex(format!(
            "metadata store has {} records, manifest says {}",
            record_count, manifest.total_chunks
        )));
    }

    debug!(
        "snapshot artifacts validated: {} splits, {} chunks",
        manifest.split_count, manifest.total_chunks
    );

    let index = VectorIndex::from_parts(
        manifest.dimensions,
        manifest.model_id.clone(),
        vectors.data,
        mappings.split_to_chunk,
        mappings.chunk_to_splits,
    );
    let store = SnapshotStore {
        db,
        split_count: manifest.split_count,
    };

    info!("loaded snapshot from {}", dir.display());
    Ok((index, store))
}

/// Offline [`GraphStore`] backed by the persisted metadata artifact
///
/// Supports everything semantic search and the global keyword scan need.
/// Edge traversal is not persisted, so seed-based walks and asset
/// enrichment report a backing-store error; the enricher degrades to no
/// enrichment by design.
#[derive(Debug)]
pub struct SnapshotStore {
    db: sled::Db,
    split_count: usize,
}

impl SnapshotStore {
    fn record(&self, chunk_id: &str) -> Result<Option<ChunkRecord>> {
        let Some(bytes) = self
            .db
            .get(chunk_id.as_bytes())
            .map_err(|e| RetrievalError::backing_store(anyhow::anyhow!(e)))?
        else {
            return Ok(None);
        };
        let record = bincode::deserialize(&bytes).map_err(|e| {
            RetrievalError::CorruptIndex(format!("unreadable chunk record {}: {}", chunk_id, e))
        })?;
        Ok(Some(record))
    }

    fn records(&self) -> Result<Vec<ChunkRecord>> {
        let mut records = Vec::with_capacity(self.db.len());
        for entry in self.db.iter() {
            let (_, bytes) = entry.map_err(|e| RetrievalError::backing_store(anyhow::anyhow!(e)))?;
            let record: ChunkRecord = bincode::deserialize(&bytes)
                .map_err(|e| RetrievalError::CorruptIndex(format!("unreadable chunk record: {}", e)))?;
            records.push(record);
        }
        Ok(records)
    }

    fn no_edges() -> RetrievalError {
        RetrievalError::backing_store(anyhow::anyhow!(
            "snapshot store has no graph edges; traversal requires the live graph source"
        ))
    }

    /// Statistics over the persisted snapshot
    pub fn stats(&self) -> Result<SnapshotStats> {
        let records = self.records()?;
        let mut unique_sources = std::collections::HashSet::new();
        let mut by_source_kind: HashMap<String, usize> = HashMap::new();
        for record in &records {
            if let Some(source) = &record.source {
                unique_sources.insert(source.url.clone());
                *by_source_kind.entry(source.kind.to_string()).or_default() += 1;
            }
        }
        Ok(SnapshotStats {
            total_chunks: records.len(),
            unique_sources: unique_sources.len(),
            split_count: self.split_count,
            by_source_kind,
        })
    }
}

/// Summary counts for a loaded snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub total_chunks: usize,
    pub unique_sources: usize,
    pub split_count: usize,
    /// Chunk counts keyed by owning source kind
    pub by_source_kind: HashMap<String, usize>,
}

impl GraphStore for SnapshotStore {
    fn all_chunks(&self) -> Result<Vec<Chunk>> {
        // sled iterates in key order, so output is already sorted by id
        Ok(self
            .records()?
            .into_iter()
            .map(|r| Chunk {
                id: r.chunk_id,
                text: r.text,
                modality: r.modality,
            })
            .collect())
    }

    fn chunk(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        Ok(self.record(chunk_id)?.map(|r| Chunk {
            id: r.chunk_id,
            text: r.text,
            modality: r.modality,
        }))
    }

    fn sources_for(&self, chunk_ids: &[ChunkId]) -> Result<HashMap<ChunkId, SourceInfo>> {
        let mut map = HashMap::new();
        for chunk_id in chunk_ids {
            if let Some(record) = self.record(chunk_id)? {
                if let Some(source) = record.source {
                    map.insert(chunk_id.clone(), source);
                }
            }
        }
        Ok(map)
    }

    fn source(&self, _url: &str) -> Result<Option<SourceInfo>> {
        Err(Self::no_edges())
    }

    fn chunks_of(&self, _url: &str) -> Result<Vec<Chunk>> {
        Err(Self::no_edges())
    }

    fn neighbors(&self, _url: &str) -> Result<Vec<String>> {
        Err(Self::no_edges())
    }

    fn contained_assets(&self, _page_url: &str, _cap: usize) -> Result<Vec<AssetRef>> {
        Err(Self::no_edges())
    }
}
