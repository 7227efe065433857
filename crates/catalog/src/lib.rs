//! In-memory reference catalog for pillid.
//!
//! The catalog holds one immutable [`CatalogSnapshot`] of reference
//! descriptors plus shape/color metadata, rebuilt wholesale from the
//! persistence collaborator and published with an atomic swap. Readers hold
//! on to the snapshot they obtained; a concurrent refresh never mutates a
//! snapshot already handed out.

mod cache;
mod snapshot;
mod source;

pub use cache::CatalogCache;
pub use snapshot::{CatalogEntry, CatalogSnapshot};
pub use source::{CatalogRow, CatalogSource, DrugInfo, MemorySource};

use thiserror::Error;

/// Errors surfaced by the catalog layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    /// The persistence collaborator could not be reached or failed mid-read.
    #[error("catalog source unavailable: {0}")]
    SourceUnavailable(String),
    /// The collaborator returned a row the cache cannot use.
    #[error("invalid catalog row for drug {drug_id}: {reason}")]
    InvalidRow { drug_id: i64, reason: String },
}
