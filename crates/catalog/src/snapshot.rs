//! Immutable point-in-time views of the catalog.

use std::time::SystemTime;

use extract::FeatureVector;
use serde::{Deserialize, Serialize};

/// One searchable reference image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub drug_id: i64,
    pub image_id: i64,
    pub vector: FeatureVector,
    /// Euclidean norm of `vector`, cached at build time so the scan does not
    /// recompute it per query.
    pub norm: f32,
    pub shape: Option<String>,
    pub color: Option<String>,
}

/// An immutable, ordered sequence of catalog entries.
///
/// Entries are sorted by `(drug_id, image_id)` at build time so that every
/// scan over the same snapshot visits them in the same order; a cancelled
/// search's partial ranking is therefore reproducible.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    entries: Vec<CatalogEntry>,
    generation: u64,
    built_at: SystemTime,
}

impl CatalogSnapshot {
    pub(crate) fn new(mut entries: Vec<CatalogEntry>, generation: u64) -> Self {
        entries.sort_by_key(|e| (e.drug_id, e.image_id));
        Self {
            entries,
            generation,
            built_at: SystemTime::now(),
        }
    }

    /// An empty snapshot, the state before the first successful build.
    pub(crate) fn empty() -> Self {
        Self {
            entries: Vec::new(),
            generation: 0,
            built_at: SystemTime::now(),
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Monotonically increasing counter, bumped on every successful swap.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    /// Dimension of the descriptors in this snapshot, `None` when empty.
    pub fn dim(&self) -> Option<usize> {
        self.entries.first().map(|e| e.vector.dim())
    }
}
