//! Store trait definitions.

use super::{AnnotationUpdate, NewReference, ReferenceRecord};
use crate::error::StoreError;

/// Stores image bytes under opaque keys
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any previous blob
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Read the blob stored under `key`
    ///
    /// Fails with `StoreError::BlobNotFound` if nothing is stored there.
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Remove the blob under `key`; removing a missing key is not an error
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Stores reference records
pub trait RecordStore: Send + Sync {
    /// Insert a record, returning its assigned id
    fn insert(&self, record: NewReference) -> Result<i64, StoreError>;

    /// All records, newest first
    fn select_all(&self) -> Result<Vec<ReferenceRecord>, StoreError>;

    /// A single record by id
    fn get(&self, id: i64) -> Result<ReferenceRecord, StoreError>;

    /// Set or clear the annotation of one record
    fn update_annotation(&self, id: i64, annotation: Option<&str>) -> Result<(), StoreError>;

    /// Apply several annotation edits.
    ///
    /// Backends with transactions override this so a missing id leaves
    /// every record untouched.
    fn update_annotations(&self, updates: &[AnnotationUpdate]) -> Result<(), StoreError> {
        for update in updates {
            self.update_annotation(update.id, update.annotation.as_deref())?;
        }
        Ok(())
    }
}
