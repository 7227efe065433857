//! The persistence collaborator boundary.
//!
//! The relational store that owns drug records and their precomputed
//! descriptors lives outside this engine. [`CatalogSource`] is the seam it is
//! consumed through; [`MemorySource`] is the in-process implementation used
//! by tests and embedded deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::CatalogError;

/// One persisted catalog row: a reference image's descriptor plus the
/// appearance metadata used for filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub drug_id: i64,
    pub image_id: i64,
    pub feature_vector: Vec<f32>,
    pub shape: Option<String>,
    pub color: Option<String>,
}

/// Descriptive drug metadata used to hydrate final results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugInfo {
    pub drug_id: i64,
    pub name: String,
    pub english_name: Option<String>,
    pub license_number: Option<String>,
    pub shape: Option<String>,
    pub color: Option<String>,
}

/// Read-only access to the persisted catalog.
pub trait CatalogSource: Send + Sync {
    /// Fetch every catalog row. Called once per build/refresh.
    fn fetch_rows(&self) -> Result<Vec<CatalogRow>, CatalogError>;

    /// Look up descriptive metadata for one drug.
    fn drug_by_id(&self, drug_id: i64) -> Result<Option<DrugInfo>, CatalogError>;
}

/// In-memory catalog source.
///
/// `set_unavailable` simulates a collaborator outage, which the cache must
/// survive by keeping its previous snapshot.
#[derive(Default)]
pub struct MemorySource {
    rows: RwLock<Vec<CatalogRow>>,
    drugs: RwLock<HashMap<i64, DrugInfo>>,
    unavailable: AtomicBool,
}

impl MemorySource {
    pub fn new(rows: Vec<CatalogRow>, drugs: Vec<DrugInfo>) -> Self {
        let drugs = drugs.into_iter().map(|d| (d.drug_id, d)).collect();
        Self {
            rows: RwLock::new(rows),
            drugs: RwLock::new(drugs),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Replace the stored rows, e.g. between refreshes in tests.
    pub fn set_rows(&self, rows: Vec<CatalogRow>) {
        *self.rows.write().unwrap_or_else(|p| p.into_inner()) = rows;
    }

    /// Toggle simulated unavailability.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), CatalogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CatalogError::SourceUnavailable(
                "memory source marked unavailable".into(),
            ));
        }
        Ok(())
    }
}

impl CatalogSource for MemorySource {
    fn fetch_rows(&self) -> Result<Vec<CatalogRow>, CatalogError> {
        self.check_available()?;
        Ok(self
            .rows
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone())
    }

    fn drug_by_id(&self, drug_id: i64) -> Result<Option<DrugInfo>, CatalogError> {
        self.check_available()?;
        Ok(self
            .drugs
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&drug_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(drug_id: i64) -> CatalogRow {
        CatalogRow {
            drug_id,
            image_id: drug_id * 10,
            feature_vector: vec![1.0, 0.0],
            shape: Some("circle".into()),
            color: Some("white".into()),
        }
    }

    #[test]
    fn memory_source_serves_rows_and_metadata() {
        let source = MemorySource::new(
            vec![sample_row(1)],
            vec![DrugInfo {
                drug_id: 1,
                name: "acetaminophen".into(),
                english_name: None,
                license_number: None,
                shape: Some("circle".into()),
                color: Some("white".into()),
            }],
        );
        assert_eq!(source.fetch_rows().expect("rows").len(), 1);
        let info = source.drug_by_id(1).expect("lookup").expect("present");
        assert_eq!(info.name, "acetaminophen");
        assert!(source.drug_by_id(99).expect("lookup").is_none());
    }

    #[test]
    fn unavailable_source_errors() {
        let source = MemorySource::new(vec![sample_row(1)], vec![]);
        source.set_unavailable(true);
        assert!(matches!(
            source.fetch_rows(),
            Err(CatalogError::SourceUnavailable(_))
        ));
        source.set_unavailable(false);
        assert!(source.fetch_rows().is_ok());
    }
}
