//! # Store Module
//!
//! Collaborator stores for reference images.
//!
//! ## Backends
//! - `FsBlobStore` - Image bytes in a directory tree, addressed by key
//! - `InMemoryBlobStore` - For testing
//! - `SqliteRecordStore` - Reference records in an `image_files` table
//! - `InMemoryRecordStore` - For testing

mod blob_fs;
mod blob_memory;
mod memory;
mod sqlite;
mod traits;

pub use blob_fs::FsBlobStore;
pub use blob_memory::InMemoryBlobStore;
pub use memory::InMemoryRecordStore;
pub use sqlite::SqliteRecordStore;
pub use traits::{BlobStore, RecordStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered reference image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    /// Identity assigned by the store
    pub id: i64,
    /// Original file name
    pub file_name: String,
    /// Blob key of the stored image
    pub locator: String,
    /// Fingerprint in canonical hex form
    pub fingerprint: String,
    /// Free-text annotation, editable after registration
    pub annotation: Option<String>,
    /// When the record was inserted; `None` if the stored timestamp is
    /// unreadable
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields supplied when registering a reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReference {
    pub file_name: String,
    pub locator: String,
    pub fingerprint: String,
    pub annotation: Option<String>,
}

/// One annotation edit in a batch update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationUpdate {
    pub id: i64,
    /// `None` clears the annotation
    pub annotation: Option<String>,
}

/// Treat blank annotations as absent
pub fn normalize_annotation(annotation: Option<&str>) -> Option<String> {
    annotation
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
