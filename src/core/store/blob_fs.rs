//! Filesystem blob store.

use super::BlobStore;
use crate::error::StoreError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Stores each blob as a file below a root directory.
///
/// Keys are relative `/`-separated paths; keys that would escape the
/// root are rejected.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root).map_err(|e| StoreError::OpenFailed {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// The root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !is_plain {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
            });
        }

        Ok(self.root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let blob_error = |source| StoreError::Blob {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(blob_error)?;
        }
        fs::write(&path, bytes).map_err(blob_error)?;

        tracing::debug!(key, bytes = bytes.len(), "Stored blob");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;

        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::BlobNotFound {
                key: key.to_string(),
            },
            _ => StoreError::Blob {
                key: key.to_string(),
                source: e,
            },
        })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(key, "Removed blob");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Blob {
                key: key.to_string(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn put_then_get_returns_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp_dir.path()).unwrap();

        store.put("source-images/a.png", b"png bytes").unwrap();

        assert_eq!(store.get("source-images/a.png").unwrap(), b"png bytes");
        assert!(temp_dir.path().join("source-images").join("a.png").exists());
    }

    #[test]
    fn missing_key_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp_dir.path()).unwrap();

        assert!(matches!(
            store.get("source-images/missing.png"),
            Err(StoreError::BlobNotFound { .. })
        ));
    }

    #[test]
    fn delete_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp_dir.path()).unwrap();

        store.put("source-images/a.png", b"x").unwrap();
        store.delete("source-images/a.png").unwrap();

        assert!(!temp_dir.path().join("source-images").join("a.png").exists());
        assert!(store.delete("source-images/a.png").is_ok());
        assert!(matches!(
            store.delete("../a.png"),
            Err(StoreError::InvalidKey { .. })
        ));
    }

    #[test]
    fn escaping_keys_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp_dir.path()).unwrap();

        for key in ["../outside.png", "/etc/passwd", "", "a/../../b"] {
            assert!(matches!(
                store.put(key, b"x"),
                Err(StoreError::InvalidKey { .. })
            ));
        }
    }

    #[test]
    fn open_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested").join("blobs");

        let store = FsBlobStore::open(&root).unwrap();

        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }
}
