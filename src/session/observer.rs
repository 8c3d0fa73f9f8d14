//! Session signals
//!
//! Presentation layers subscribe to a session through [`SessionObserver`].
//! Callbacks run after the session's internal lock is released, so an
//! observer may call back into the session.

use std::sync::Mutex;

use super::state::{EndReason, LockReason};
use super::timer::TimeBand;

/// Receives session signals. Every method defaults to a no-op.
pub trait SessionObserver: Send + Sync {
    /// The one-shot first-violation warning fired.
    fn on_warning(&self, _violation_count: u32) {}

    /// The session locked; the embedded form must be hidden and detached.
    fn on_locked(&self, _final_count: u32, _duration_minutes: u64, _reason: LockReason) {}

    /// The countdown ticked.
    fn on_timer_tick(&self, _remaining_seconds: u64, _band: TimeBand) {}

    /// The session ended without a lock.
    fn on_ended(&self, _reason: EndReason) {}
}

/// Observer that ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// A signal captured by [`RecordingObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// `on_warning`
    Warning {
        /// Count at the time of the warning
        violation_count: u32,
    },
    /// `on_locked`
    Locked {
        /// Final count
        final_count: u32,
        /// Elapsed whole minutes
        duration_minutes: u64,
        /// Lock reason
        reason: LockReason,
    },
    /// `on_timer_tick`
    TimerTick {
        /// Seconds left
        remaining_seconds: u64,
        /// Display band
        band: TimeBand,
    },
    /// `on_ended`
    Ended {
        /// End reason
        reason: EndReason,
    },
}

/// Observer that keeps every signal in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    signals: Mutex<Vec<Signal>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the signals received so far.
    #[must_use]
    pub fn signals(&self) -> Vec<Signal> {
        self.signals
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Counts signals matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&Signal) -> bool) -> usize {
        self.signals().iter().filter(|s| predicate(s)).count()
    }

    fn push(&self, signal: Signal) {
        if let Ok(mut signals) = self.signals.lock() {
            signals.push(signal);
        }
    }
}

impl SessionObserver for RecordingObserver {
    fn on_warning(&self, violation_count: u32) {
        self.push(Signal::Warning { violation_count });
    }

    fn on_locked(&self, final_count: u32, duration_minutes: u64, reason: LockReason) {
        self.push(Signal::Locked {
            final_count,
            duration_minutes,
            reason,
        });
    }

    fn on_timer_tick(&self, remaining_seconds: u64, band: TimeBand) {
        self.push(Signal::TimerTick {
            remaining_seconds,
            band,
        });
    }

    fn on_ended(&self, reason: EndReason) {
        self.push(Signal::Ended { reason });
    }
}
