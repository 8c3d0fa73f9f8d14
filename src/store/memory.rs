//! In-memory store, for tests and throwaway runs.

use std::sync::Mutex;

use crate::error::StoreError;

use super::{DocumentBackend, StoreDocument};

/// Store backed by a document held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<StoreDocument>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `document`.
    #[must_use]
    pub fn with_document(document: StoreDocument) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }
}

impl DocumentBackend for MemoryStore {
    fn read_document(&self) -> Result<StoreDocument, StoreError> {
        self.document
            .lock()
            .map(|doc| doc.clone())
            .map_err(|_| StoreError::Poisoned)
    }

    fn update_document<R>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> R,
    ) -> Result<R, StoreError> {
        let mut doc = self.document.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut doc))
    }
}
