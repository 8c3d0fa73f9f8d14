//! Event log storage
//!
//! The log is shared by every session in one browsing context, so appends
//! are serialized behind a mutex. It is capacity-bounded: once full, the
//! oldest entries are discarded to make room.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::debug;

use crate::error::StoreError;
use crate::observability::metrics;

use super::LogEntry;

/// Maximum number of entries the log retains.
pub const MAX_EVENTS: usize = 500;

/// Append/read access to the session event log.
///
/// Appends may fail; sessions log such failures and carry on. Sessions
/// append while holding their own lock, so a slow append delays every other
/// operation on that session.
pub trait EventLog: Send + Sync {
    /// Appends an entry, discarding the oldest if the log is full.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the entry could not be persisted.
    fn append(&self, entry: LogEntry) -> Result<(), StoreError>;

    /// Returns entries in insertion order, optionally for one session only.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the log could not be read.
    fn read(&self, session_id: Option<&str>) -> Result<Vec<LogEntry>, StoreError>;
}

/// Pushes `item`, then drops from the front until `len <= capacity`.
///
/// Returns the number of items dropped.
pub fn push_bounded<T>(items: &mut VecDeque<T>, item: T, capacity: usize) -> usize {
    items.push_back(item);
    let excess = items.len().saturating_sub(capacity);
    items.drain(..excess);
    if excess > 0 {
        debug!(dropped = excess, capacity, "log full, oldest entries discarded");
        metrics::record_log_truncated(excess);
    }
    excess
}

/// In-memory event log.
#[derive(Debug)]
pub struct MemoryEventLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl Default for MemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEventLog {
    /// Creates a log holding at most [`MAX_EVENTS`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_EVENTS)
    }

    /// Creates a log holding at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(MAX_EVENTS))),
            capacity,
        }
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |e| e.len())
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventLog for MemoryEventLog {
    fn append(&self, entry: LogEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        push_bounded(&mut entries, entry, self.capacity);
        Ok(())
    }

    fn read(&self, session_id: Option<&str>) -> Result<Vec<LogEntry>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries
            .iter()
            .filter(|e| session_id.is_none_or(|id| e.session_id == id))
            .cloned()
            .collect())
    }
}
