//! In-memory blob store for testing.

use super::BlobStore;
use crate::error::StoreError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

/// In-memory blob store
///
/// Useful for testing and scenarios where persistence isn't needed.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    /// Whether no blobs are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut blobs = self.blobs.write().map_err(|_| StoreError::Corrupted {
            path: PathBuf::from("memory"),
        })?;

        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let blobs = self.blobs.read().map_err(|_| StoreError::Corrupted {
            path: PathBuf::from("memory"),
        })?;

        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound {
                key: key.to_string(),
            })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut blobs = self.blobs.write().map_err(|_| StoreError::Corrupted {
            path: PathBuf::from("memory"),
        })?;

        blobs.remove(key);
        Ok(())
    }
}
