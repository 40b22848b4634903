//! Attaches contained assets to page-backed results

use crate::graph::GraphStore;
use crate::types::{RetrievedChunk, SourceKind};
use std::sync::Arc;
use tracing::debug;

/// Decorates page results with the assets their source page contains.
///
/// Enrichment is best-effort: if the backing store cannot answer a
/// containment query (an offline snapshot has no edges at all), the
/// result is returned without assets rather than failing the search.
pub struct ContextEnricher {
    store: Arc<dyn GraphStore>,
    cap: usize,
}

impl ContextEnricher {
    pub fn new(store: Arc<dyn GraphStore>, cap: usize) -> Self {
        Self { store, cap }
    }

    pub fn enrich(&self, results: &mut [RetrievedChunk]) {
        for result in results.iter_mut() {
            if result.source_type != SourceKind::Page {
                continue;
            }
            match self.store.contained_assets(&result.source_url, self.cap) {
                Ok(assets) if !assets.is_empty() => {
                    result.related_assets = Some(assets);
                }
                Ok(_) => {}
                Err(err) => {
                    debug!(url = %result.source_url, error = %err, "asset lookup unavailable");
                }
            }
        }
    }
}
