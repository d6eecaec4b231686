//! SQLite-backed blob store.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::{BlobStore, StorageResult, SCHEMA};

/// Blob slots persisted in a SQLite database file.
pub struct SqliteBlobStore {
    conn: Connection,
}

impl SqliteBlobStore {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Initialize schema.
    fn initialize(&self) -> StorageResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// List stored slot names.
    pub fn slots(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT slot FROM blob_slots ORDER BY slot")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut slots = Vec::new();
        for row in rows {
            slots.push(row?);
        }
        Ok(slots)
    }
}

impl BlobStore for SqliteBlobStore {
    fn read(&self, slot: &str) -> StorageResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT payload FROM blob_slots WHERE slot = ?",
                [slot],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn write(&self, slot: &str, blob: &str) -> StorageResult<()> {
        // Single statement: SQLite applies it atomically.
        self.conn.execute(
            r#"
            INSERT INTO blob_slots (slot, payload, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(slot) DO UPDATE SET
                payload = excluded.payload,
                updated_at = datetime('now')
            "#,
            params![slot, blob],
        )?;
        Ok(())
    }
}
