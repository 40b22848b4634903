//! Vector index and persisted snapshot artifacts

mod snapshot;
mod vector;

pub use snapshot::{load_snapshot, persist_snapshot, SnapshotStats, SnapshotStore};
pub use vector::{SplitHit, VectorIndex};
