//! SQLite record store for persistent storage.

use super::{AnnotationUpdate, NewReference, RecordStore, ReferenceRecord};
use crate::error::StoreError;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SELECT_COLUMNS: &str =
    "SELECT id, file_name, locator, phash, description, uploaded_at FROM image_files";

/// SQLite-backed reference table
///
/// Uses WAL (Write-Ahead Logging) mode so listing can proceed while a
/// registration is being written.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteRecordStore {
    /// Open or create a reference database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            reason: e.to_string(),
        })?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS image_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_name TEXT NOT NULL,
                locator TEXT NOT NULL,
                phash TEXT NOT NULL,
                description TEXT,
                uploaded_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    /// RFC 3339, or SQLite's own `YYYY-MM-DD HH:MM:SS[.fff]` taken as UTC
    fn parse_uploaded_at(text: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                    .ok()
                    .map(|t| t.and_utc())
            })
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<ReferenceRecord> {
        let id: i64 = row.get(0)?;
        let uploaded_at: Option<String> = row.get(5)?;

        let created_at = uploaded_at.as_deref().and_then(Self::parse_uploaded_at);
        if created_at.is_none() {
            tracing::warn!(id, uploaded_at = ?uploaded_at, "Unreadable upload timestamp");
        }

        Ok(ReferenceRecord {
            id,
            file_name: row.get(1)?,
            locator: row.get(2)?,
            fingerprint: row.get(3)?,
            annotation: row.get(4)?,
            created_at,
        })
    }
}

impl RecordStore for SqliteRecordStore {
    fn insert(&self, record: NewReference) -> Result<i64, StoreError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO image_files (file_name, locator, phash, description, uploaded_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                record.file_name,
                record.locator,
                record.fingerprint,
                record.annotation,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    fn select_all(&self) -> Result<Vec<ReferenceRecord>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(&format!("{} ORDER BY id DESC", SELECT_COLUMNS))
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let records = stmt
            .query_map([], Self::read_row)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(records)
    }

    fn get(&self, id: i64) -> Result<ReferenceRecord, StoreError> {
        let conn = self.lock()?;

        let result = conn.query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            [id],
            Self::read_row,
        );

        match result {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::RecordNotFound { id }),
            Err(e) => Err(StoreError::QueryFailed(e.to_string())),
        }
    }

    fn update_annotation(&self, id: i64, annotation: Option<&str>) -> Result<(), StoreError> {
        let conn = self.lock()?;

        let changed = conn
            .execute(
                "UPDATE image_files SET description = ? WHERE id = ?",
                params![annotation, id],
            )
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        if changed == 0 {
            return Err(StoreError::RecordNotFound { id });
        }
        Ok(())
    }

    fn update_annotations(&self, updates: &[AnnotationUpdate]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;

        let tx = conn
            .transaction()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        for update in updates {
            let changed = tx
                .execute(
                    "UPDATE image_files SET description = ? WHERE id = ?",
                    params![update.annotation, update.id],
                )
                .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

            // Dropping the transaction rolls it back
            if changed == 0 {
                return Err(StoreError::RecordNotFound { id: update.id });
            }
        }

        tx.commit()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}
