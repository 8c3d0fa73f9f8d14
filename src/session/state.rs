//! Session state representation
//!
//! Plain data plus the pure transition rules of a monitored session.
//! [`SessionState`] performs no I/O; `MonitoredSession` owns one behind a
//! mutex and turns each step into log entries, signals and metrics.

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::events::SessionEvent;

use super::timer::TimeBand;

/// Lifecycle status of a session.
///
/// Moves forward only. `Locked` and `Ended` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Monitoring, no outstanding warning.
    Active,
    /// The one-shot warning has been issued and not yet acknowledged.
    Warned,
    /// Form hidden; nothing further is recorded.
    Locked,
    /// The page went away before a lock.
    Ended,
}

impl SessionStatus {
    /// Returns whether no further transitions can happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Locked | Self::Ended)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "Active",
            Self::Warned => "Warned",
            Self::Locked => "Locked",
            Self::Ended => "Ended",
        };
        f.write_str(s)
    }
}

/// Why a session was locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    /// The violation count reached the configured threshold.
    MaxViolationsExceeded,
    /// The countdown reached zero.
    TimeExpired,
}

impl LockReason {
    /// Wire name, as stored in the event log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxViolationsExceeded => "max_violations_exceeded",
            Self::TimeExpired => "time_expired",
        }
    }
}

/// Why a session ended without being locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The page was closed or navigated away.
    PageUnload,
    /// The embedding application ended the session.
    Explicit,
}

impl EndReason {
    /// Wire name, as stored in the event log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PageUnload => "page_unload",
            Self::Explicit => "explicit",
        }
    }
}

/// What a single violation did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationStep {
    /// The session is terminal; nothing changed.
    Ignored,
    /// Counted, no policy change.
    Counted {
        /// Count after this violation
        count: u32,
    },
    /// First violation; the one-shot warning fires.
    Warned {
        /// Count after this violation
        count: u32,
    },
    /// Threshold reached; the session is now locked.
    Locked {
        /// Final count
        count: u32,
    },
}

/// Mutable state of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    status: SessionStatus,
    violation_count: u32,
    warning_shown: bool,
    lock_reason: Option<LockReason>,
    end_reason: Option<EndReason>,
    student_identity: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Creates an `Active` state with no violations.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: SessionStatus::Active,
            violation_count: 0,
            warning_shown: false,
            lock_reason: None,
            end_reason: None,
            student_identity: None,
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Violations recorded so far.
    #[must_use]
    pub const fn violation_count(&self) -> u32 {
        self.violation_count
    }

    /// Whether the one-shot warning has fired.
    #[must_use]
    pub const fn warning_shown(&self) -> bool {
        self.warning_shown
    }

    /// Reason the session locked, if it did.
    #[must_use]
    pub const fn lock_reason(&self) -> Option<LockReason> {
        self.lock_reason
    }

    /// Reason the session ended, if it did.
    #[must_use]
    pub const fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Student email, if provided.
    #[must_use]
    pub fn student_identity(&self) -> Option<&str> {
        self.student_identity.as_deref()
    }

    /// Counts one violation and applies threshold policy.
    ///
    /// Reaching `allowed_violations` locks, and lock wins over the
    /// first-violation warning when both apply on the same call.
    pub fn record_violation(&mut self, allowed_violations: u32) -> ViolationStep {
        if self.status.is_terminal() {
            return ViolationStep::Ignored;
        }

        self.violation_count = self.violation_count.saturating_add(1);
        let count = self.violation_count;

        if count >= allowed_violations {
            self.status = SessionStatus::Locked;
            self.lock_reason = Some(LockReason::MaxViolationsExceeded);
            return ViolationStep::Locked { count };
        }

        if count == 1 && !self.warning_shown {
            self.warning_shown = true;
            self.status = SessionStatus::Warned;
            return ViolationStep::Warned { count };
        }

        ViolationStep::Counted { count }
    }

    /// Locks the session. Returns `false` if it was already terminal.
    pub fn lock(&mut self, reason: LockReason) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Locked;
        self.lock_reason = Some(reason);
        true
    }

    /// Ends the session. Returns `false` if it was already terminal.
    pub fn end(&mut self, reason: EndReason) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Ended;
        self.end_reason = Some(reason);
        true
    }

    /// Clears an outstanding warning. The warning never fires again.
    pub fn acknowledge_warning(&mut self) -> bool {
        if self.status != SessionStatus::Warned {
            return false;
        }
        self.status = SessionStatus::Active;
        true
    }

    /// Rebuilds the state of a session from its logged events.
    ///
    /// Used when a reloaded page continues a session it already started.
    pub fn replay<'a>(events: impl IntoIterator<Item = &'a SessionEvent>) -> Self {
        let mut state = Self::new();
        for event in events {
            match event {
                SessionEvent::SessionStarted { student_email, .. } => {
                    if let Some(email) = student_email {
                        state.student_identity.get_or_insert_with(|| email.clone());
                    }
                }
                SessionEvent::EmailProvided { email } => {
                    state.student_identity.get_or_insert_with(|| email.clone());
                }
                SessionEvent::ViolationRecorded { count, .. } => {
                    state.violation_count = state.violation_count.max(*count);
                }
                SessionEvent::Warned { .. } => {
                    state.warning_shown = true;
                    if !state.status.is_terminal() {
                        state.status = SessionStatus::Warned;
                    }
                }
                SessionEvent::SessionLocked {
                    final_violation_count,
                    lock_reason,
                    ..
                } => {
                    state.violation_count = *final_violation_count;
                    state.lock(*lock_reason);
                }
                SessionEvent::SessionEnded { reason, .. } => {
                    state.end(*reason);
                }
            }
        }
        state
    }

    /// Records the student identity.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::AlreadySet` if an identity was recorded before.
    pub fn set_identity(&mut self, email: String) -> Result<(), IdentityError> {
        if self.student_identity.is_some() {
            return Err(IdentityError::AlreadySet);
        }
        self.student_identity = Some(email);
        Ok(())
    }
}

/// Display band for the violation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationBand {
    /// Far from the threshold.
    Normal,
    /// At least half way to the threshold.
    Elevated,
    /// One violation away from the threshold, or past it.
    High,
}

impl ViolationBand {
    /// Classifies `count` against `allowed`.
    #[must_use]
    pub const fn classify(count: u32, allowed: u32) -> Self {
        if count == 0 {
            Self::Normal
        } else if count >= allowed.saturating_sub(1) {
            Self::High
        } else if count >= allowed / 2 {
            Self::Elevated
        } else {
            Self::Normal
        }
    }
}

/// Read-only snapshot handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    /// Session identifier.
    pub session_id: String,
    /// Violations recorded so far.
    pub violation_count: u32,
    /// Lock threshold.
    pub max_violations: u32,
    /// Current status.
    pub status: SessionStatus,
    /// Seconds left on the countdown, when a time limit is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
    /// Countdown display band, when a time limit is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_band: Option<TimeBand>,
    /// Violation counter display band.
    pub violation_band: ViolationBand,
    /// Lock reason once locked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_reason: Option<LockReason>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = SessionState::new();
        assert_eq!(state.status(), SessionStatus::Active);
        assert_eq!(state.violation_count(), 0);
        assert!(!state.warning_shown());
        assert_eq!(state.lock_reason(), None);
    }

    #[test]
    fn test_first_violation_warns() {
        let mut state = SessionState::new();
        assert_eq!(state.record_violation(3), ViolationStep::Warned { count: 1 });
        assert_eq!(state.status(), SessionStatus::Warned);
        assert!(state.warning_shown());
    }

    #[test]
    fn test_second_violation_counts_only() {
        let mut state = SessionState::new();
        state.record_violation(3);
        assert_eq!(state.record_violation(3), ViolationStep::Counted { count: 2 });
        assert_eq!(state.status(), SessionStatus::Warned);
    }

    #[test]
    fn test_threshold_locks() {
        let mut state = SessionState::new();
        state.record_violation(2);
        assert_eq!(state.record_violation(2), ViolationStep::Locked { count: 2 });
        assert_eq!(state.status(), SessionStatus::Locked);
        assert_eq!(state.lock_reason(), Some(LockReason::MaxViolationsExceeded));
    }

    #[test]
    fn test_lock_beats_warning_at_threshold_one() {
        let mut state = SessionState::new();
        assert_eq!(state.record_violation(1), ViolationStep::Locked { count: 1 });
        assert!(!state.warning_shown());
    }

    #[test]
    fn test_locked_ignores_violations() {
        let mut state = SessionState::new();
        state.lock(LockReason::TimeExpired);
        assert_eq!(state.record_violation(3), ViolationStep::Ignored);
        assert_eq!(state.violation_count(), 0);
    }

    #[test]
    fn test_lock_is_idempotent() {
        let mut state = SessionState::new();
        assert!(state.lock(LockReason::TimeExpired));
        assert!(!state.lock(LockReason::MaxViolationsExceeded));
        assert_eq!(state.lock_reason(), Some(LockReason::TimeExpired));
    }

    #[test]
    fn test_end_after_lock_rejected() {
        let mut state = SessionState::new();
        state.lock(LockReason::TimeExpired);
        assert!(!state.end(EndReason::PageUnload));
        assert_eq!(state.status(), SessionStatus::Locked);
    }

    #[test]
    fn test_ended_is_terminal() {
        let mut state = SessionState::new();
        assert!(state.end(EndReason::Explicit));
        assert!(!state.lock(LockReason::TimeExpired));
        assert_eq!(state.record_violation(3), ViolationStep::Ignored);
    }

    #[test]
    fn test_acknowledge_warning_never_rewarns() {
        let mut state = SessionState::new();
        state.record_violation(5);
        assert!(state.acknowledge_warning());
        assert_eq!(state.status(), SessionStatus::Active);
        assert!(!state.acknowledge_warning());
        assert_eq!(state.record_violation(5), ViolationStep::Counted { count: 2 });
        assert_eq!(state.status(), SessionStatus::Active);
    }

    #[test]
    fn test_identity_set_once() {
        let mut state = SessionState::new();
        state.set_identity("a@b.co".to_string()).unwrap();
        assert_eq!(
            state.set_identity("c@d.co".to_string()),
            Err(IdentityError::AlreadySet)
        );
        assert_eq!(state.student_identity(), Some("a@b.co"));
    }

    #[test]
    fn test_replay_restores_progress() {
        let events = [
            SessionEvent::SessionStarted {
                student_email: None,
                allowed_violations: 3,
                session_duration_minutes: None,
            },
            SessionEvent::EmailProvided {
                email: "s@uni.edu".to_string(),
            },
            SessionEvent::ViolationRecorded {
                violation_type: crate::session::violation::ViolationKind::TabSwitch,
                count: 1,
                student_email: Some("s@uni.edu".to_string()),
            },
            SessionEvent::Warned { count: 1 },
        ];
        let state = SessionState::replay(&events);
        assert_eq!(state.violation_count(), 1);
        assert_eq!(state.status(), SessionStatus::Warned);
        assert!(state.warning_shown());
        assert_eq!(state.student_identity(), Some("s@uni.edu"));
    }

    #[test]
    fn test_replay_of_locked_session_stays_locked() {
        let events = [SessionEvent::SessionLocked {
            final_violation_count: 3,
            session_duration: 4,
            lock_reason: LockReason::MaxViolationsExceeded,
        }];
        let mut state = SessionState::replay(&events);
        assert_eq!(state.status(), SessionStatus::Locked);
        assert_eq!(state.violation_count(), 3);
        assert_eq!(state.record_violation(3), ViolationStep::Ignored);
    }

    #[test]
    fn test_violation_bands() {
        assert_eq!(ViolationBand::classify(0, 3), ViolationBand::Normal);
        assert_eq!(ViolationBand::classify(1, 3), ViolationBand::Elevated);
        assert_eq!(ViolationBand::classify(2, 3), ViolationBand::High);
        assert_eq!(ViolationBand::classify(1, 10), ViolationBand::Normal);
        assert_eq!(ViolationBand::classify(5, 10), ViolationBand::Elevated);
        assert_eq!(ViolationBand::classify(9, 10), ViolationBand::High);
    }
}
