//! SQLite schema definition.

/// Schema for the SQLite blob store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Blob Slots
-- ============================================================================

-- One row per named slot; the catalog writes its whole collection to one row.
CREATE TABLE IF NOT EXISTS blob_slots (
    slot TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Empty payloads are never a valid write
CREATE TRIGGER IF NOT EXISTS blob_slots_check_payload BEFORE INSERT ON blob_slots
WHEN length(new.payload) = 0
BEGIN
    SELECT RAISE(ABORT, 'Slot payload must not be empty');
END;

CREATE TRIGGER IF NOT EXISTS blob_slots_check_payload_update BEFORE UPDATE ON blob_slots
WHEN length(new.payload) = 0
BEGIN
    SELECT RAISE(ABORT, 'Slot payload must not be empty');
END;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_empty_payload_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO blob_slots (slot, payload) VALUES ('catalog_items', '')",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO blob_slots (slot, payload) VALUES ('catalog_items', '[]')",
            [],
        );
        assert!(result.is_ok());
    }
}
