//! Persistence for the item collection.
//!
//! The whole collection lives in one named slot of a [`BlobStore`]. The
//! [`ItemStore`] frames it in a checksummed envelope and never lets a
//! corrupt or missing blob escape as an error from [`ItemStore::load`].

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryBlobStore;
pub use schema::SCHEMA;
pub use sqlite::SqliteBlobStore;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::CatalogItem;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u32 = 1;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, found {found}")]
    Checksum { expected: String, found: String },

    #[error("Unsupported envelope version: {0}")]
    Version(u32),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Raw read/write of named text slots.
///
/// A `write` must replace the slot in one step: either the new blob is
/// stored or the previous one is left untouched.
pub trait BlobStore: Send {
    fn read(&self, slot: &str) -> StorageResult<Option<String>>;
    fn write(&self, slot: &str, blob: &str) -> StorageResult<()>;
}

/// On-disk framing of the collection.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    /// SHA-256 of `payload`
    checksum: String,
    /// JSON array of items
    payload: String,
}

/// Collection-level persistence port over a [`BlobStore`] slot.
pub struct ItemStore {
    backend: Box<dyn BlobStore>,
    slot: String,
}

impl ItemStore {
    pub fn new(backend: impl BlobStore + 'static, slot: impl Into<String>) -> Self {
        Self {
            backend: Box::new(backend),
            slot: slot.into(),
        }
    }

    /// Load the collection, surfacing decode and backend failures.
    pub fn try_load(&self) -> StorageResult<Vec<CatalogItem>> {
        match self.backend.read(&self.slot)? {
            Some(blob) => decode(&blob),
            None => Ok(Vec::new()),
        }
    }

    /// Load the collection; an unreadable or corrupt blob reads as empty.
    pub fn load(&self) -> Vec<CatalogItem> {
        match self.try_load() {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(slot = %self.slot, error = %e, "catalog blob unreadable, starting empty");
                Vec::new()
            }
        }
    }

    /// Replace the stored collection.
    pub fn save(&self, items: &[CatalogItem]) -> StorageResult<()> {
        let blob = encode(items)?;
        self.backend.write(&self.slot, &blob).map_err(|e| {
            tracing::warn!(slot = %self.slot, error = %e, "catalog write failed");
            e
        })?;
        tracing::debug!(slot = %self.slot, count = items.len(), "catalog saved");
        Ok(())
    }
}

/// Serialize items into an envelope.
pub fn encode(items: &[CatalogItem]) -> StorageResult<String> {
    let payload = serde_json::to_string(items)?;
    let envelope = Envelope {
        version: ENVELOPE_VERSION,
        checksum: checksum(payload.as_bytes()),
        payload,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode an envelope, or a bare JSON array written by older consoles.
pub fn decode(blob: &str) -> StorageResult<Vec<CatalogItem>> {
    let trimmed = blob.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let envelope: Envelope = serde_json::from_str(trimmed)?;
    if envelope.version != ENVELOPE_VERSION {
        return Err(StorageError::Version(envelope.version));
    }
    let found = checksum(envelope.payload.as_bytes());
    if found != envelope.checksum {
        return Err(StorageError::Checksum {
            expected: envelope.checksum,
            found,
        });
    }
    Ok(serde_json::from_str(&envelope.payload)?)
}

/// Compute SHA-256 hash of data.
pub fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
