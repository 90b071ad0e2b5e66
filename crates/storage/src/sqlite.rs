//! SQLite-backed object store.
//!
//! One file, one `objects` table. The connection is owned by the store and
//! closed when the store is dropped, so every exit path (including an error
//! half-way through a query) releases it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{ffi, params, Connection, OpenFlags};
use serde::Deserialize;

use crate::error::StorageError;
use crate::record::{ObjectRecord, RawRecord};
use crate::traits::ObjectStore;

/// Default busy timeout (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

const CREATE_OBJECTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS objects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    metadata TEXT,
    description TEXT,
    connections TEXT
);";

/// Configuration for the SQLite object store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl SqliteStoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Object store persisted in a single SQLite file.
#[derive(Debug)]
pub struct SqliteObjectStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteObjectStore {
    /// Open (creating if needed) the database at `config.path` and ensure the
    /// schema exists.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, StorageError> {
        validate_path(&config.path)?;
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(&config.path, flags)
            .map_err(|e| unavailable(&config.path, e))?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|e| unavailable(&config.path, e))?;

        let store = Self {
            conn,
            path: config.path.clone(),
        };
        store.create_schema()?;
        tracing::debug!(path = %store.path.display(), "opened object store");
        Ok(store)
    }

    /// Open an existing database read-only. Nothing is created: a missing
    /// file, or a file without the objects table, is `Unavailable`.
    pub fn open_existing(config: &SqliteStoreConfig) -> Result<Self, StorageError> {
        validate_path(&config.path)?;
        if !config.path.exists() {
            return Err(unavailable(&config.path, "no such file"));
        }
        let conn = Connection::open_with_flags(&config.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| unavailable(&config.path, e))?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|e| unavailable(&config.path, e))?;
        tracing::debug!(path = %config.path.display(), "opened object store read-only");
        Ok(Self {
            conn,
            path: config.path.clone(),
        })
    }

    /// Delete any existing database file at `config.path`, then open a new one.
    pub fn open_fresh(config: &SqliteStoreConfig) -> Result<Self, StorageError> {
        validate_path(&config.path)?;
        if config.path.exists() {
            std::fs::remove_file(&config.path).map_err(|e| unavailable(&config.path, e))?;
            tracing::info!(path = %config.path.display(), "removed existing database file");
        }
        Self::open(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, e: impl std::fmt::Display) -> StorageError {
        unavailable(&self.path, e)
    }
}

impl ObjectStore for SqliteObjectStore {
    fn create_schema(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(CREATE_OBJECTS_TABLE)
            .map_err(|e| self.unavailable(e))
    }

    fn insert_records(&self, records: &[ObjectRecord]) -> Result<usize, StorageError> {
        // Dropping an uncommitted transaction rolls it back.
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO objects (id, name, metadata, description, connections)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            for record in records {
                let columns = record.encode_columns()?;
                stmt.execute(params![
                    record.id,
                    record.name,
                    columns.metadata,
                    record.description,
                    columns.connections,
                ])
                .map_err(|e| insert_error(&record.id, e))?;
            }
        }
        tx.commit().map_err(|e| StorageError::Backend(e.to_string()))?;
        tracing::debug!(count = records.len(), "inserted objects");
        Ok(records.len())
    }

    fn insert_raw(&self, id: &str, name: &str, metadata_raw: &str) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT INTO objects (id, name, metadata, description, connections)
                 VALUES (?1, ?2, ?3, NULL, '[]')",
                params![id, name, metadata_raw],
            )
            .map_err(|e| insert_error(id, e))?;
        Ok(())
    }

    fn list_records(&self) -> Result<Vec<RawRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, metadata FROM objects ORDER BY rowid")
            .map_err(|e| self.unavailable(e))?;
        let rows = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let metadata_raw = metadata_text(row.get_ref(1)?);
                Ok(RawRecord { name, metadata_raw })
            })
            .map_err(|e| self.unavailable(e))?;
        let records = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.unavailable(e))?;
        Ok(records)
    }

    fn count_records(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM objects", [], |row| row.get(0))
            .map_err(|e| self.unavailable(e))?;
        usize::try_from(count).map_err(|e| StorageError::Backend(e.to_string()))
    }
}

/// Render a metadata cell as text whatever its storage class. Bytes that are
/// not valid UTF-8 are replaced, so the record still reaches the engine and
/// fails to parse there instead of failing the whole listing.
fn metadata_text(cell: ValueRef<'_>) -> String {
    match cell {
        ValueRef::Null => "null".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn validate_path(path: &Path) -> Result<(), StorageError> {
    if path.as_os_str().is_empty() {
        return Err(unavailable(path, "store path is empty"));
    }
    if path.is_dir() {
        return Err(unavailable(
            path,
            "store path must be a file, not a directory",
        ));
    }
    Ok(())
}

fn unavailable(path: &Path, e: impl std::fmt::Display) -> StorageError {
    StorageError::Unavailable {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn insert_error(id: &str, e: rusqlite::Error) -> StorageError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            StorageError::DuplicateId { id: id.to_string() }
        }
        _ => StorageError::Backend(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, SqliteObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteStoreConfig::new(dir.path().join("objects.db"));
        let store = SqliteObjectStore::open(&config).unwrap();
        (dir, store)
    }

    #[test]
    fn null_metadata_column_reads_back_as_null_text() {
        let (_dir, store) = temp_store();
        store
            .conn
            .execute(
                "INSERT INTO objects (id, name, metadata) VALUES ('obj-x', 'Nulled', NULL)",
                [],
            )
            .unwrap();
        let records = store.list_records().unwrap();
        assert_eq!(records, vec![RawRecord::new("Nulled", "null")]);
    }

    #[test]
    fn blob_metadata_is_listed_as_text() {
        let (_dir, store) = temp_store();
        let text = r#"{"type":"dataset","memory_percent":5}"#;
        store
            .conn
            .execute(
                "INSERT INTO objects (id, name, metadata) VALUES ('obj-b', 'Blobbed', ?1)",
                params![text.as_bytes().to_vec()],
            )
            .unwrap();
        let records = store.list_records().unwrap();
        assert_eq!(records, vec![RawRecord::new("Blobbed", text)]);
    }

    #[test]
    fn invalid_utf8_metadata_does_not_fail_the_listing() {
        let (_dir, store) = temp_store();
        store
            .insert_raw("obj-1", "Good", r#"{"type": "dataset"}"#)
            .unwrap();
        store
            .conn
            .execute(
                "INSERT INTO objects (id, name, metadata) VALUES ('obj-2', 'Mangled', ?1)",
                params![vec![0xff_u8, 0xfe, b'{']],
            )
            .unwrap();
        store
            .conn
            .execute(
                "INSERT INTO objects (id, name, metadata) \
                 VALUES ('obj-3', 'BadText', CAST(X'7BFF7D' AS TEXT))",
                [],
            )
            .unwrap();
        let records = store.list_records().unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Good", "Mangled", "BadText"]);
        assert_eq!(records[1].metadata_raw, "\u{fffd}\u{fffd}{");
        assert_eq!(records[2].metadata_raw, "{\u{fffd}}");
    }

    #[test]
    fn numeric_metadata_is_listed_as_its_text_form() {
        let (_dir, store) = temp_store();
        store
            .conn
            .execute(
                "INSERT INTO objects (id, name, metadata) VALUES ('obj-n', 'Numeric', 42)",
                [],
            )
            .unwrap();
        let records = store.list_records().unwrap();
        assert_eq!(records, vec![RawRecord::new("Numeric", "42")]);
    }

    #[test]
    fn connections_are_stored_as_json_text() {
        let (_dir, store) = temp_store();
        let record = ObjectRecord::new("obj-1", "A", json!({"type": "dataset"}))
            .with_connections(["conn-01", "conn-02"]);
        store.insert_records(&[record]).unwrap();
        let stored: String = store
            .conn
            .query_row(
                "SELECT connections FROM objects WHERE id = 'obj-1'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(stored, r#"["conn-01","conn-02"]"#);
    }

    #[test]
    fn directory_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteObjectStore::open(&SqliteStoreConfig::new(dir.path())).unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }), "{err}");
    }

    #[test]
    fn busy_timeout_defaults_when_omitted_from_config() {
        let config: SqliteStoreConfig =
            serde_json::from_value(json!({ "path": "object_store.db" })).unwrap();
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
    }
}
