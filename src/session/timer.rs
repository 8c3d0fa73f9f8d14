//! Countdown timer
//!
//! Remaining time is always derived from the session start instant plus
//! the configured duration, never accumulated from ticks, so a late or
//! skipped tick cannot drift the deadline.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Interval between countdown ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Below this the countdown is shown as critical.
pub const CRITICAL_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Below this the countdown is shown as a warning.
pub const WARNING_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// Display band for the remaining time. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBand {
    /// Ten minutes or more left.
    Normal,
    /// Under ten minutes left.
    Warning,
    /// Under five minutes left.
    Critical,
}

impl TimeBand {
    /// Classifies a remaining duration.
    #[must_use]
    pub fn classify(remaining: Duration) -> Self {
        if remaining < CRITICAL_THRESHOLD {
            Self::Critical
        } else if remaining < WARNING_THRESHOLD {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

/// Result of evaluating the countdown at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Time remains.
    Remaining(Duration),
    /// The deadline has passed.
    Expired,
}

/// Deadline for a time-limited session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    started_at: Instant,
    duration: Duration,
}

impl Countdown {
    /// Creates a countdown running from `started_at` for `duration`.
    #[must_use]
    pub const fn new(started_at: Instant, duration: Duration) -> Self {
        Self {
            started_at,
            duration,
        }
    }

    /// Instant at which the session expires.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.started_at + self.duration
    }

    /// Configured duration.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Time left at `now`, saturating at zero.
    #[must_use]
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.deadline().saturating_duration_since(now)
    }

    /// Evaluates the countdown at `now`.
    #[must_use]
    pub fn tick_at(&self, now: Instant) -> Tick {
        let remaining = self.remaining_at(now);
        if remaining.is_zero() {
            Tick::Expired
        } else {
            Tick::Remaining(remaining)
        }
    }
}

/// Formats a duration as `MM:SS`, truncating sub-second precision.
#[must_use]
pub fn format_mmss(remaining: Duration) -> String {
    let total = remaining.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}
