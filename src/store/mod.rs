//! Persistence
//!
//! All persisted state lives in one [`StoreDocument`]: link
//! configurations, the session event log and the instructor analytics log.
//! A [`DocumentBackend`] only knows how to read and atomically update that
//! document; the store traits are implemented once on top of it.

pub mod file;
pub mod memory;

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::error::StoreError;
use crate::events::{EventLog, LogEntry, MAX_EVENTS, push_bounded};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Maximum number of analytics entries retained.
pub const MAX_ANALYTICS: usize = 100;

// ============================================================================
// Document
// ============================================================================

/// Everything the store persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreDocument {
    /// Link configurations by id, in creation order.
    pub wrapper_links: IndexMap<String, Configuration>,
    /// Session event log, oldest first.
    pub session_events: VecDeque<LogEntry>,
    /// Instructor actions, oldest first.
    pub analytics_log: VecDeque<AnalyticsEntry>,
}

/// Instructor action recorded for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsAction {
    /// A link was created.
    WrapperCreated,
    /// A link was deleted.
    WrapperDeleted,
}

/// Policy summary kept with an analytics entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    /// Lock threshold.
    pub allowed_violations: u32,
    /// Time limit in minutes.
    pub session_duration: Option<u32>,
    /// Whether an email is required.
    pub require_email: bool,
}

impl From<&Configuration> for PolicySummary {
    fn from(config: &Configuration) -> Self {
        Self {
            allowed_violations: config.allowed_violations,
            session_duration: config.session_duration_minutes,
            require_email: config.require_email,
        }
    }
}

/// One analytics log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEntry {
    /// Link id.
    pub id: String,
    /// What happened.
    pub action: AnalyticsAction,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Policy of the link at the time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<PolicySummary>,
}

// ============================================================================
// Traits
// ============================================================================

/// Raw access to the persisted document.
pub trait DocumentBackend: Send + Sync {
    /// Returns a snapshot of the document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the document cannot be read.
    fn read_document(&self) -> Result<StoreDocument, StoreError>;

    /// Applies `f` to the document and persists the result atomically with
    /// respect to other updates through this backend.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the document cannot be read or written.
    fn update_document<R>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> R,
    ) -> Result<R, StoreError>;
}

/// Link configuration storage.
pub trait ConfigStore: Send + Sync {
    /// Stores `config` under `id`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be written.
    fn save_config(&self, id: &str, config: &Configuration) -> Result<(), StoreError>;

    /// Loads the configuration stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    fn load_config(&self, id: &str) -> Result<Option<Configuration>, StoreError>;

    /// Lists every stored configuration, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    fn list_configs(&self) -> Result<IndexMap<String, Configuration>, StoreError>;

    /// Removes the configuration under `id`. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be written.
    fn delete_config(&self, id: &str) -> Result<bool, StoreError>;
}

/// Instructor analytics storage.
pub trait AnalyticsLog: Send + Sync {
    /// Appends an entry, keeping at most [`MAX_ANALYTICS`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be written.
    fn record_analytics(&self, entry: AnalyticsEntry) -> Result<(), StoreError>;

    /// Returns all retained entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    fn analytics(&self) -> Result<Vec<AnalyticsEntry>, StoreError>;
}

// ============================================================================
// Implementations over any backend
// ============================================================================

impl<B: DocumentBackend> ConfigStore for B {
    fn save_config(&self, id: &str, config: &Configuration) -> Result<(), StoreError> {
        self.update_document(|doc| {
            doc.wrapper_links.insert(id.to_string(), config.clone());
        })
    }

    fn load_config(&self, id: &str) -> Result<Option<Configuration>, StoreError> {
        Ok(self.read_document()?.wrapper_links.get(id).cloned())
    }

    fn list_configs(&self) -> Result<IndexMap<String, Configuration>, StoreError> {
        Ok(self.read_document()?.wrapper_links)
    }

    fn delete_config(&self, id: &str) -> Result<bool, StoreError> {
        self.update_document(|doc| doc.wrapper_links.shift_remove(id).is_some())
    }
}

impl<B: DocumentBackend> EventLog for B {
    fn append(&self, entry: LogEntry) -> Result<(), StoreError> {
        self.update_document(|doc| {
            push_bounded(&mut doc.session_events, entry, MAX_EVENTS);
        })
    }

    fn read(&self, session_id: Option<&str>) -> Result<Vec<LogEntry>, StoreError> {
        Ok(self
            .read_document()?
            .session_events
            .into_iter()
            .filter(|e| session_id.is_none_or(|id| e.session_id == id))
            .collect())
    }
}

impl<B: DocumentBackend> AnalyticsLog for B {
    fn record_analytics(&self, entry: AnalyticsEntry) -> Result<(), StoreError> {
        self.update_document(|doc| {
            push_bounded(&mut doc.analytics_log, entry, MAX_ANALYTICS);
        })
    }

    fn analytics(&self) -> Result<Vec<AnalyticsEntry>, StoreError> {
        Ok(self.read_document()?.analytics_log.into())
    }
}

/// Removes every link, event and analytics entry.
///
/// # Errors
///
/// Returns `StoreError` if the store cannot be written.
pub fn clear_all<B: DocumentBackend>(backend: &B) -> Result<(), StoreError> {
    backend.update_document(|doc| *doc = StoreDocument::default())
}
