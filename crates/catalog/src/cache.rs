//! Snapshot building and hot swap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use extract::FeatureVector;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::{CatalogEntry, CatalogError, CatalogRow, CatalogSnapshot, CatalogSource};

/// Atomically swappable holder of the current [`CatalogSnapshot`].
///
/// The read path takes the lock only long enough to clone an `Arc`; the
/// snapshot itself is immutable, so in-flight searches keep working on the
/// snapshot they grabbed while a refresh publishes a new one.
pub struct CatalogCache {
    current: RwLock<Arc<CatalogSnapshot>>,
    generation: AtomicU64,
}

impl CatalogCache {
    /// Create a cache holding an empty snapshot.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::empty())),
            generation: AtomicU64::new(0),
        }
    }

    /// The current snapshot. Never blocks on a refresh in progress beyond
    /// the pointer swap itself; an empty store yields an empty snapshot,
    /// not an error.
    pub fn current(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Read all persisted rows and publish a fresh snapshot.
    ///
    /// On source failure the previous snapshot remains authoritative: the
    /// error is returned to the maintenance caller and logged, but searches
    /// keep using stale-but-available data.
    pub fn refresh(&self, source: &dyn CatalogSource) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let rows = match source.fetch_rows() {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "catalog refresh failed, keeping previous snapshot");
                return Err(err);
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(build_snapshot(rows, generation));
        info!(
            generation,
            entries = snapshot.len(),
            "catalog snapshot published"
        );

        let mut slot = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = snapshot.clone();
        Ok(snapshot)
    }

    /// Initial build; identical to [`refresh`](Self::refresh), named for the
    /// startup call site.
    pub fn build(&self, source: &dyn CatalogSource) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        self.refresh(source)
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Materialize entries off to the side. Rows whose descriptor dimension
/// deviates from the first row's are skipped with a warning rather than
/// poisoning the whole snapshot.
fn build_snapshot(rows: Vec<CatalogRow>, generation: u64) -> CatalogSnapshot {
    let expected_dim = rows.first().map(|r| r.feature_vector.len());

    let entries: Vec<CatalogEntry> = rows
        .into_par_iter()
        .filter_map(|row| {
            if Some(row.feature_vector.len()) != expected_dim {
                warn!(
                    drug_id = row.drug_id,
                    image_id = row.image_id,
                    dim = row.feature_vector.len(),
                    "skipping catalog row with mismatched descriptor dimension"
                );
                return None;
            }
            let vector = FeatureVector::new(row.feature_vector);
            let norm = vector.norm();
            Some(CatalogEntry {
                drug_id: row.drug_id,
                image_id: row.image_id,
                vector,
                norm,
                shape: row.shape,
                color: row.color,
            })
        })
        .collect();

    CatalogSnapshot::new(entries, generation)
}
