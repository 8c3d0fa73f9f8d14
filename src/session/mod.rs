//! Monitored session
//!
//! The session state machine and everything it needs: violation kinds,
//! the countdown, session identity and the observer interface.

pub mod identity;
pub mod machine;
pub mod observer;
pub mod state;
pub mod timer;
pub mod violation;

pub use identity::{ResumeMarkers, generate_session_id, resume_key};
pub use machine::{MonitoredSession, SessionBuilder, ViolationOutcome, validate_email};
pub use observer::{NoopObserver, RecordingObserver, SessionObserver, Signal};
pub use state::{
    EndReason, LockReason, SessionState, SessionStatus, StatusView, ViolationBand, ViolationStep,
};
pub use timer::{Countdown, Tick, TimeBand, format_mmss};
pub use violation::{UnknownViolation, ViolationKind};
