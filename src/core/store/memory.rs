//! In-memory record store for testing.

use super::{NewReference, RecordStore, ReferenceRecord};
use crate::error::StoreError;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::RwLock;

/// In-memory record store
///
/// Records are kept in insertion order; ids start at 1.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<ReferenceRecord>>,
}

impl InMemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `records` as-is.
    ///
    /// Lets tests seed rows that registration would never produce,
    /// such as corrupt fingerprint text.
    pub fn with_records(records: Vec<ReferenceRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    fn poisoned() -> StoreError {
        StoreError::Corrupted {
            path: PathBuf::from("memory"),
        }
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert(&self, record: NewReference) -> Result<i64, StoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;

        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        records.push(ReferenceRecord {
            id,
            file_name: record.file_name,
            locator: record.locator,
            fingerprint: record.fingerprint,
            annotation: record.annotation,
            created_at: Some(Utc::now()),
        });

        Ok(id)
    }

    fn select_all(&self) -> Result<Vec<ReferenceRecord>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;

        let mut all = records.clone();
        all.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(all)
    }

    fn get(&self, id: i64) -> Result<ReferenceRecord, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;

        records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::RecordNotFound { id })
    }

    fn update_annotation(&self, id: i64, annotation: Option<&str>) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;

        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::RecordNotFound { id })?;

        record.annotation = annotation.map(str::to_string);
        Ok(())
    }
}
