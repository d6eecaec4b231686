//! In-memory blob store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{BlobStore, StorageError, StorageResult};

/// Process-local slots. Clones share the same slots, so a test can keep a
/// handle to inspect or corrupt what the repository wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw slot contents.
    pub fn raw(&self, slot: &str) -> Option<String> {
        self.slots.lock().ok()?.get(slot).cloned()
    }

    /// Overwrite a slot, bypassing the write-failure switch.
    pub fn put_raw(&self, slot: &str, blob: &str) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.insert(slot.to_string(), blob.to_string());
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, slot: &str) -> StorageResult<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|e| StorageError::Backend(format!("Lock poisoned: {}", e)))?;
        Ok(slots.get(slot).cloned())
    }

    fn write(&self, slot: &str, blob: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("write rejected".into()));
        }
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| StorageError::Backend(format!("Lock poisoned: {}", e)))?;
        slots.insert(slot.to_string(), blob.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write() {
        let store = MemoryBlobStore::new();
        assert_eq!(store.read("a").unwrap(), None);

        store.write("a", "[]").unwrap();
        assert_eq!(store.read("a").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_clones_share_slots() {
        let store = MemoryBlobStore::new();
        let handle = store.clone();
        store.write("a", "x").unwrap();
        assert_eq!(handle.raw("a").as_deref(), Some("x"));
    }

    #[test]
    fn test_fail_writes() {
        let store = MemoryBlobStore::new();
        store.write("a", "old").unwrap();
        store.fail_writes(true);

        assert!(store.write("a", "new").is_err());
        assert_eq!(store.raw("a").as_deref(), Some("old"));
    }
}
