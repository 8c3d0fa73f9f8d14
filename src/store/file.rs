//! File-backed store.
//!
//! The whole document is one pretty-printed JSON file. Every update is a
//! read-modify-write under an exclusive advisory lock on a sibling
//! `<store>.lock` file, so separate processes sharing one store serialize
//! their updates. New contents go to a uniquely named temp file in the same
//! directory and are renamed over the original, so a reader never sees a
//! truncated store and readers need no lock.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;

use super::{DocumentBackend, StoreDocument};

/// Store persisted as a JSON document on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes writers within this process; the file lock covers the rest.
    lock: Mutex<()>,
}

impl FileStore {
    /// Opens (without creating) the store at `path`.
    ///
    /// A missing or empty file reads as an empty document; the file and
    /// its parent directory are created on first write.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the advisory lock file guarding updates.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        let mut lock = self.path.clone().into_os_string();
        lock.push(".lock");
        PathBuf::from(lock)
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Opens the lock file and blocks until this handle holds it exclusively.
    ///
    /// The lock is released when the returned file is dropped.
    fn lock_exclusive(&self) -> Result<File, StoreError> {
        fs::create_dir_all(self.parent_dir())?;
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        FileExt::lock_exclusive(&lock_file)?;
        Ok(lock_file)
    }

    fn load(&self) -> Result<StoreDocument, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(StoreDocument::default()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(doc)?;
        let mut tmp = NamedTempFile::new_in(self.parent_dir())?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(
            path = %self.path.display(),
            links = doc.wrapper_links.len(),
            events = doc.session_events.len(),
            "store written"
        );
        Ok(())
    }
}

impl DocumentBackend for FileStore {
    fn read_document(&self) -> Result<StoreDocument, StoreError> {
        self.load()
    }

    fn update_document<R>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> R,
    ) -> Result<R, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let _file_lock = self.lock_exclusive()?;
        let mut doc = self.load()?;
        let result = f(&mut doc);
        self.persist(&doc)?;
        Ok(result)
    }
}
