//! Instructor reporting
//!
//! Read-only views over the store: headline totals, one summary per
//! session, the most recent violations, and a full JSON export.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::config::Configuration;
use crate::error::StoreError;
use crate::events::{EventType, LogEntry, SessionEvent};
use crate::session::ViolationKind;
use crate::store::{AnalyticsEntry, DocumentBackend};

/// Sessions listed by default.
pub const SESSION_LIMIT: usize = 50;

/// Violations listed by default.
pub const VIOLATION_LIMIT: usize = 100;

/// Headline totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Stored links.
    pub total_links: usize,
    /// Distinct session ids in the log.
    pub total_sessions: usize,
    /// Logged violations.
    pub total_violations: usize,
    /// Logged locks.
    pub locked_sessions: usize,
}

/// Outcome of a session as seen from the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    /// No lock or end logged yet.
    Active,
    /// Locked.
    Locked,
    /// Ended without a lock.
    Completed,
}

impl std::fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Active => "Active",
            Self::Locked => "Locked",
            Self::Completed => "Completed",
        })
    }
}

/// Coarse severity of a violation count, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountClass {
    /// Fewer than two.
    Low,
    /// Two.
    Medium,
    /// Three or more.
    High,
}

impl CountClass {
    /// Classifies a violation count.
    #[must_use]
    pub const fn of(count: u32) -> Self {
        match count {
            0 | 1 => Self::Low,
            2 => Self::Medium,
            _ => Self::High,
        }
    }
}

/// Everything the log says about one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session id.
    pub session_id: String,
    /// Student email, if one was logged.
    pub student_email: Option<String>,
    /// When the session started.
    pub started_at: Option<DateTime<Utc>>,
    /// When it locked or ended.
    pub ended_at: Option<DateTime<Utc>>,
    /// Highest logged violation count.
    pub violations: u32,
    /// Outcome so far.
    pub status: SummaryStatus,
    /// Logged duration in minutes, once finished.
    pub duration_minutes: Option<u64>,
}

impl SessionSummary {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            student_email: None,
            started_at: None,
            ended_at: None,
            violations: 0,
            status: SummaryStatus::Active,
            duration_minutes: None,
        }
    }

    fn apply(&mut self, entry: &LogEntry) {
        match &entry.event {
            SessionEvent::SessionStarted { student_email, .. } => {
                self.started_at = Some(entry.timestamp);
                if student_email.is_some() {
                    self.student_email.clone_from(student_email);
                }
            }
            SessionEvent::EmailProvided { email } => {
                self.student_email = Some(email.clone());
            }
            SessionEvent::ViolationRecorded { count, .. } => {
                self.violations = self.violations.max(*count);
            }
            SessionEvent::Warned { .. } => {}
            SessionEvent::SessionLocked {
                session_duration, ..
            } => {
                self.status = SummaryStatus::Locked;
                self.ended_at = Some(entry.timestamp);
                self.duration_minutes = Some(*session_duration);
            }
            SessionEvent::SessionEnded { duration, .. } => {
                self.status = SummaryStatus::Completed;
                self.ended_at = Some(entry.timestamp);
                self.duration_minutes = Some(*duration);
            }
        }
    }
}

/// One logged violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
    /// Session it belongs to.
    pub session_id: String,
    /// Student email, if known at the time.
    pub student_email: Option<String>,
    /// What was detected.
    pub kind: ViolationKind,
    /// Running count.
    pub count: u32,
}

/// Full dump of the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    /// Stored links by id.
    pub wrappers: IndexMap<String, Configuration>,
    /// Instructor analytics.
    pub analytics: Vec<AnalyticsEntry>,
    /// Session event log.
    pub session_events: Vec<LogEntry>,
    /// When the export was taken.
    pub exported_at: DateTime<Utc>,
}

/// Computes headline totals.
#[must_use]
pub fn statistics(total_links: usize, events: &[LogEntry]) -> Statistics {
    let mut sessions = std::collections::HashSet::new();
    let mut stats = Statistics {
        total_links,
        ..Statistics::default()
    };
    for entry in events {
        sessions.insert(entry.session_id.as_str());
        match entry.event_type() {
            EventType::ViolationRecorded => stats.total_violations += 1,
            EventType::SessionLocked => stats.locked_sessions += 1,
            _ => {}
        }
    }
    stats.total_sessions = sessions.len();
    stats
}

/// Groups the log by session, most recently started first.
///
/// Sessions whose start fell out of the log sort last.
#[must_use]
pub fn summarize_sessions(events: &[LogEntry], limit: usize) -> Vec<SessionSummary> {
    let mut by_id: IndexMap<&str, SessionSummary> = IndexMap::new();
    for entry in events {
        by_id
            .entry(entry.session_id.as_str())
            .or_insert_with(|| SessionSummary::new(&entry.session_id))
            .apply(entry);
    }
    let mut sessions: Vec<_> = by_id.into_values().collect();
    sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    sessions.truncate(limit);
    sessions
}

/// Returns logged violations, newest first.
#[must_use]
pub fn recent_violations(events: &[LogEntry], limit: usize) -> Vec<ViolationRecord> {
    let mut records: Vec<_> = events
        .iter()
        .filter_map(|entry| match &entry.event {
            SessionEvent::ViolationRecorded {
                violation_type,
                count,
                student_email,
            } => Some(ViolationRecord {
                timestamp: entry.timestamp,
                session_id: entry.session_id.clone(),
                student_email: student_email.clone(),
                kind: *violation_type,
                count: *count,
            }),
            _ => None,
        })
        .collect();
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records.truncate(limit);
    records
}

/// Snapshots the whole store for export.
///
/// # Errors
///
/// Returns `StoreError` if the store cannot be read.
pub fn export<B: DocumentBackend + ?Sized>(backend: &B) -> Result<Export, StoreError> {
    let doc = backend.read_document()?;
    Ok(Export {
        wrappers: doc.wrapper_links,
        analytics: doc.analytics_log.into(),
        session_events: doc.session_events.into(),
        exported_at: Utc::now(),
    })
}
