//! Session event log
//!
//! Typed, timestamped records of everything a session does. Entries are
//! serialized as `{timestamp, sessionId, event: {eventType, payload}}`
//! so consumers can dispatch on `eventType` without knowing every payload.

pub mod log;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::state::{EndReason, LockReason};
use crate::session::violation::ViolationKind;

pub use log::{EventLog, MAX_EVENTS, MemoryEventLog, push_bounded};

/// Discriminant of a [`SessionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Monitoring began.
    SessionStarted,
    /// The student provided an email.
    EmailProvided,
    /// A violation was counted.
    ViolationRecorded,
    /// The one-shot warning fired.
    Warned,
    /// The session locked.
    SessionLocked,
    /// The session ended without a lock.
    SessionEnded,
}

impl EventType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::EmailProvided => "email_provided",
            Self::ViolationRecorded => "violation_recorded",
            Self::Warned => "warned",
            Self::SessionLocked => "session_locked",
            Self::SessionEnded => "session_ended",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A session event with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "eventType",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum SessionEvent {
    /// Monitoring began.
    SessionStarted {
        /// Student email, when known at start.
        student_email: Option<String>,
        /// Lock threshold in force.
        allowed_violations: u32,
        /// Time limit in force.
        session_duration_minutes: Option<u32>,
    },

    /// The student provided an email.
    EmailProvided {
        /// The email.
        email: String,
    },

    /// A violation was counted.
    ViolationRecorded {
        /// What was detected.
        violation_type: ViolationKind,
        /// Running count including this violation.
        count: u32,
        /// Student email, if known.
        student_email: Option<String>,
    },

    /// The one-shot warning fired.
    Warned {
        /// Count when the warning fired.
        count: u32,
    },

    /// The session locked.
    SessionLocked {
        /// Count at lock time.
        final_violation_count: u32,
        /// Elapsed whole minutes.
        session_duration: u64,
        /// Why it locked.
        lock_reason: LockReason,
    },

    /// The session ended without a lock.
    SessionEnded {
        /// Why it ended.
        reason: EndReason,
        /// Elapsed whole minutes.
        duration: u64,
    },
}

impl SessionEvent {
    /// Returns the discriminant.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::SessionStarted { .. } => EventType::SessionStarted,
            Self::EmailProvided { .. } => EventType::EmailProvided,
            Self::ViolationRecorded { .. } => EventType::ViolationRecorded,
            Self::Warned { .. } => EventType::Warned,
            Self::SessionLocked { .. } => EventType::SessionLocked,
            Self::SessionEnded { .. } => EventType::SessionEnded,
        }
    }
}

/// One entry of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Session the event belongs to.
    pub session_id: String,
    /// The event.
    pub event: SessionEvent,
}

impl LogEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn now(session_id: impl Into<String>, event: SessionEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session_id.into(),
            event,
        }
    }

    /// Returns the event discriminant.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.event.event_type()
    }
}
