//! Configuration schema
//!
//! The policy bundle an instructor creates once and every session of that
//! link shares read-only. Field names serialize in camelCase so stored
//! documents and encoded link bundles stay readable by the browser page.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smallest accepted violation threshold.
pub const MIN_ALLOWED_VIOLATIONS: u32 = 1;

/// Largest accepted violation threshold.
pub const MAX_ALLOWED_VIOLATIONS: u32 = 10;

/// Threshold used when the instructor leaves the field blank.
pub const DEFAULT_ALLOWED_VIOLATIONS: u32 = 3;

/// Shortest accepted session duration, in minutes.
pub const MIN_SESSION_MINUTES: u32 = 5;

/// Longest accepted session duration, in minutes.
pub const MAX_SESSION_MINUTES: u32 = 300;

/// Immutable monitoring policy for one shareable link.
///
/// Missing fields deserialize to empty/zero values rather than failing,
/// so that validation can report them as `MissingRequired` with the
/// field name instead of an opaque parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Link identifier, carried inside encoded bundles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Locator of the embedded form. Opaque to the session.
    #[serde(default, alias = "googleFormUrl")]
    pub form_url: String,

    /// Inclusive lock threshold.
    #[serde(default)]
    pub allowed_violations: u32,

    /// Time limit in minutes; `None` means unlimited.
    #[serde(default, alias = "sessionDuration")]
    pub session_duration_minutes: Option<u32>,

    /// Whether the student must provide an email before monitoring starts.
    #[serde(default)]
    pub require_email: bool,

    /// When the instructor created the link.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Free-form author tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl Configuration {
    /// Creates a configuration stamped with the current time.
    #[must_use]
    pub fn new(
        form_url: impl Into<String>,
        allowed_violations: u32,
        session_duration_minutes: Option<u32>,
        require_email: bool,
    ) -> Self {
        Self {
            id: None,
            form_url: form_url.into(),
            allowed_violations,
            session_duration_minutes,
            require_email,
            created_at: Utc::now(),
            created_by: Some("instructor".to_string()),
        }
    }

    /// Returns the configured time limit, if any.
    #[must_use]
    pub fn session_duration(&self) -> Option<Duration> {
        self.session_duration_minutes
            .map(|m| Duration::from_secs(u64::from(m) * 60))
    }

    /// Returns a copy tagged with the given link id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
