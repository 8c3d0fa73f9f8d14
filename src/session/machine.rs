//! Monitored session engine
//!
//! `MonitoredSession` coordinates:
//! - Violation counting and threshold policy
//! - Event log writes for every state change
//! - Observer signals (warning, lock, tick, end)
//! - The countdown task for time-limited sessions
//! - Page-local resume markers
//!
//! All state lives in one [`SessionState`] behind a mutex. Each operation
//! computes its log entries and signals while holding the lock, then
//! releases it before calling observers.

use std::sync::{Arc, LazyLock, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{Configuration, Validator};
use crate::error::{FormLoadError, IdentityError, SessionError};
use crate::events::{EventLog, LogEntry, MemoryEventLog, SessionEvent};
use crate::observability::metrics;

use super::identity::{ResumeMarkers, generate_session_id};
use super::observer::{NoopObserver, SessionObserver};
use super::state::{
    EndReason, LockReason, SessionState, SessionStatus, StatusView, ViolationBand, ViolationStep,
};
use super::timer::{Countdown, TICK_INTERVAL, Tick, TimeBand};
use super::violation::ViolationKind;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

/// Checks that `email`, once trimmed, has a `local@domain.tld` shape.
///
/// Returns the trimmed email.
///
/// # Errors
///
/// Returns `IdentityError::InvalidFormat` otherwise.
pub fn validate_email(email: &str) -> Result<&str, IdentityError> {
    let trimmed = email.trim();
    if EMAIL_RE.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(IdentityError::InvalidFormat(email.to_string()))
    }
}

/// Whole minutes between two instants, rounded to nearest.
fn elapsed_minutes(started_at: Instant, now: Instant) -> u64 {
    let millis = now.saturating_duration_since(started_at).as_millis();
    u64::try_from((millis + 30_000) / 60_000).unwrap_or(u64::MAX)
}

/// Observer call deferred until the state lock is released.
#[derive(Debug, Clone, Copy)]
enum Signal {
    Warning(u32),
    Locked {
        count: u32,
        minutes: u64,
        reason: LockReason,
    },
    Ended(EndReason),
    Tick(u64, TimeBand),
}

/// Result of [`MonitoredSession::record_violation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViolationOutcome {
    /// Count after the call.
    pub count: u32,
    /// Status after the call.
    pub status: SessionStatus,
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`MonitoredSession`].
///
/// Only the configuration is required. The event log defaults to an
/// in-memory log and the observer to [`NoopObserver`].
pub struct SessionBuilder {
    config: Arc<Configuration>,
    identity: Option<String>,
    log: Option<Arc<dyn EventLog>>,
    observer: Arc<dyn SessionObserver>,
    markers: Option<Arc<ResumeMarkers>>,
    session_id: Option<String>,
}

impl SessionBuilder {
    /// Starts a builder for `config`.
    #[must_use]
    pub fn new(config: impl Into<Arc<Configuration>>) -> Self {
        Self {
            config: config.into(),
            identity: None,
            log: None,
            observer: Arc::new(NoopObserver),
            markers: None,
            session_id: None,
        }
    }

    /// Student email known before monitoring starts.
    #[must_use]
    pub fn identity(mut self, email: impl Into<String>) -> Self {
        self.identity = Some(email.into());
        self
    }

    /// Event log to append to.
    #[must_use]
    pub fn event_log(mut self, log: Arc<dyn EventLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Observer to signal.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Page-local resume markers.
    #[must_use]
    pub fn resume_markers(mut self, markers: Arc<ResumeMarkers>) -> Self {
        self.markers = Some(markers);
        self
    }

    /// Reuses an existing session id instead of generating one.
    ///
    /// If the resume markers show that this id has already started, the
    /// session continues from its logged events instead of starting over.
    #[must_use]
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Validates the configuration and starts monitoring.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidConfiguration` if the configuration is
    /// missing required values or out of bounds, and
    /// `SessionError::Identity` if a supplied email is malformed.
    pub fn start(self) -> Result<MonitoredSession, SessionError> {
        Validator::new()
            .validate_session(&self.config)
            .into_result()?;
        let identity = self
            .identity
            .as_deref()
            .map(validate_email)
            .transpose()?
            .map(str::to_string);

        let log = self
            .log
            .unwrap_or_else(|| Arc::new(MemoryEventLog::new()) as Arc<dyn EventLog>);
        let now = Instant::now();

        if let (Some(id), Some(markers)) = (&self.session_id, &self.markers) {
            if markers.can_resume(id) {
                return Ok(MonitoredSession::resume(
                    id.clone(),
                    self.config,
                    log,
                    self.observer,
                    Arc::clone(markers),
                    now,
                ));
            }
        }

        let session_id = self.session_id.unwrap_or_else(generate_session_id);
        let mut state = SessionState::new();
        let mut entries = vec![SessionEvent::SessionStarted {
            student_email: identity.clone(),
            allowed_violations: self.config.allowed_violations,
            session_duration_minutes: self.config.session_duration_minutes,
        }];
        if let Some(email) = identity {
            entries.push(SessionEvent::EmailProvided {
                email: email.clone(),
            });
            state.set_identity(email)?;
        }

        if let Some(markers) = &self.markers {
            markers.mark_started(&session_id);
        }

        let session = MonitoredSession::assemble(
            session_id,
            self.config,
            state,
            now,
            log,
            self.observer,
            self.markers,
        );
        for event in entries {
            session.append(event);
        }

        metrics::record_session_started();
        info!(
            session_id = %session.session_id,
            allowed_violations = session.config.allowed_violations,
            duration_minutes = ?session.config.session_duration_minutes,
            "session started"
        );
        Ok(session)
    }
}

// ============================================================================
// Session
// ============================================================================

/// One monitored exam session.
///
/// Share it behind an `Arc` when the countdown task is running.
pub struct MonitoredSession {
    session_id: String,
    config: Arc<Configuration>,
    started_at: Instant,
    countdown: Option<Countdown>,
    state: Mutex<SessionState>,
    log: Arc<dyn EventLog>,
    observer: Arc<dyn SessionObserver>,
    markers: Option<Arc<ResumeMarkers>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for MonitoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoredSession")
            .field("session_id", &self.session_id)
            .field("config", &self.config)
            .field("countdown", &self.countdown)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl MonitoredSession {
    /// Starts a session with a fresh id.
    ///
    /// Shorthand for [`SessionBuilder`] with an event log and no observer.
    ///
    /// # Errors
    ///
    /// See [`SessionBuilder::start`].
    pub fn initialize(
        config: impl Into<Arc<Configuration>>,
        identity: Option<String>,
        log: Arc<dyn EventLog>,
    ) -> Result<Self, SessionError> {
        let mut builder = SessionBuilder::new(config).event_log(log);
        if let Some(email) = identity {
            builder = builder.identity(email);
        }
        builder.start()
    }

    fn assemble(
        session_id: String,
        config: Arc<Configuration>,
        state: SessionState,
        started_at: Instant,
        log: Arc<dyn EventLog>,
        observer: Arc<dyn SessionObserver>,
        markers: Option<Arc<ResumeMarkers>>,
    ) -> Self {
        let countdown = config
            .session_duration()
            .map(|duration| Countdown::new(started_at, duration));
        let cancel = CancellationToken::new();
        if state.status().is_terminal() {
            cancel.cancel();
        }
        Self {
            session_id,
            config,
            started_at,
            countdown,
            state: Mutex::new(state),
            log,
            observer,
            markers,
            cancel,
        }
    }

    /// Continues a session that already started on this page.
    fn resume(
        session_id: String,
        config: Arc<Configuration>,
        log: Arc<dyn EventLog>,
        observer: Arc<dyn SessionObserver>,
        markers: Arc<ResumeMarkers>,
        now: Instant,
    ) -> Self {
        let entries = log.read(Some(&session_id)).unwrap_or_else(|e| {
            warn!(session_id = %session_id, error = %e, "failed to read event log for resume");
            Vec::new()
        });

        let mut state = SessionState::replay(entries.iter().map(|e| &e.event));
        if markers.warning_acknowledged(&session_id) {
            state.acknowledge_warning();
        }
        let started_at = entries
            .iter()
            .find(|e| matches!(e.event, SessionEvent::SessionStarted { .. }))
            .and_then(|e| (Utc::now() - e.timestamp).to_std().ok())
            .and_then(|elapsed| now.checked_sub(elapsed))
            .unwrap_or(now);

        info!(
            session_id = %session_id,
            violations = state.violation_count(),
            status = %state.status(),
            "session resumed"
        );
        Self::assemble(
            session_id,
            config,
            state,
            started_at,
            log,
            observer,
            Some(markers),
        )
    }

    /// Session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Configuration in force.
    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Instant monitoring started.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Countdown, when the session is time-limited.
    #[must_use]
    pub const fn countdown(&self) -> Option<Countdown> {
        self.countdown
    }

    /// Token cancelled once the session reaches a terminal status.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Snapshot of the underlying state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state().clone()
    }

    /// Returns `true` once the session is locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state().status() == SessionStatus::Locked
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn append(&self, event: SessionEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.log.append(LogEntry::now(&self.session_id, event)) {
            warn!(
                session_id = %self.session_id,
                event_type = %event_type,
                error = %e,
                "failed to append session event"
            );
        }
    }

    fn dispatch(&self, signals: &[Signal]) {
        for signal in signals {
            match *signal {
                Signal::Warning(count) => self.observer.on_warning(count),
                Signal::Locked {
                    count,
                    minutes,
                    reason,
                } => self.observer.on_locked(count, minutes, reason),
                Signal::Ended(reason) => self.observer.on_ended(reason),
                Signal::Tick(secs, band) => self.observer.on_timer_tick(secs, band),
            }
        }
    }

    /// Stops the countdown and forgets the resume marker.
    fn release(&self) {
        self.cancel.cancel();
        if let Some(markers) = &self.markers {
            markers.clear(&self.session_id);
        }
    }

    /// Appends the lock event and returns its signal. Caller holds the lock.
    fn locked_effects(&self, state: &SessionState, reason: LockReason, now: Instant) -> Signal {
        let count = state.violation_count();
        let minutes = elapsed_minutes(self.started_at, now);
        self.append(SessionEvent::SessionLocked {
            final_violation_count: count,
            session_duration: minutes,
            lock_reason: reason,
        });
        self.release();
        metrics::record_session_locked(reason);
        info!(
            session_id = %self.session_id,
            reason = reason.as_str(),
            violations = count,
            duration_minutes = minutes,
            "session locked"
        );
        Signal::Locked {
            count,
            minutes,
            reason,
        }
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Records a detected violation.
    ///
    /// Ignored once the session is terminal. Otherwise the count goes up by
    /// one, the first violation fires the one-shot warning and reaching
    /// `allowed_violations` locks the session.
    pub fn record_violation(&self, kind: ViolationKind) -> ViolationOutcome {
        self.record_violation_at(kind, Instant::now())
    }

    /// [`record_violation`](Self::record_violation) evaluated at `now`.
    pub fn record_violation_at(&self, kind: ViolationKind, now: Instant) -> ViolationOutcome {
        let mut signals = Vec::with_capacity(1);
        let outcome = {
            let mut state = self.state();
            let step = state.record_violation(self.config.allowed_violations);

            if let ViolationStep::Counted { count }
            | ViolationStep::Warned { count }
            | ViolationStep::Locked { count } = step
            {
                self.append(SessionEvent::ViolationRecorded {
                    violation_type: kind,
                    count,
                    student_email: state.student_identity().map(str::to_string),
                });
                metrics::record_violation(kind);
                info!(
                    session_id = %self.session_id,
                    kind = kind.as_str(),
                    count,
                    allowed = self.config.allowed_violations,
                    "violation recorded"
                );
            }

            match step {
                ViolationStep::Ignored => {
                    debug!(
                        session_id = %self.session_id,
                        kind = kind.as_str(),
                        status = %state.status(),
                        "violation ignored on terminal session"
                    );
                }
                ViolationStep::Counted { .. } => {}
                ViolationStep::Warned { count } => {
                    self.append(SessionEvent::Warned { count });
                    signals.push(Signal::Warning(count));
                }
                ViolationStep::Locked { .. } => {
                    signals.push(self.locked_effects(
                        &state,
                        LockReason::MaxViolationsExceeded,
                        now,
                    ));
                }
            }

            ViolationOutcome {
                count: state.violation_count(),
                status: state.status(),
            }
        };
        self.dispatch(&signals);
        outcome
    }

    /// Locks the session. Returns `false` if it was already terminal.
    pub fn lock(&self, reason: LockReason) -> bool {
        self.lock_at(reason, Instant::now())
    }

    /// [`lock`](Self::lock) evaluated at `now`.
    pub fn lock_at(&self, reason: LockReason, now: Instant) -> bool {
        let signal = {
            let mut state = self.state();
            if !state.lock(reason) {
                return false;
            }
            self.locked_effects(&state, reason, now)
        };
        self.dispatch(&[signal]);
        true
    }

    /// Ends the session without locking it, e.g. when the page unloads.
    ///
    /// Returns `false` if the session was already terminal; a locked
    /// session stays locked.
    pub fn end(&self, reason: EndReason) -> bool {
        self.end_at(reason, Instant::now())
    }

    /// [`end`](Self::end) evaluated at `now`.
    pub fn end_at(&self, reason: EndReason, now: Instant) -> bool {
        {
            let mut state = self.state();
            if !state.end(reason) {
                return false;
            }
            let minutes = elapsed_minutes(self.started_at, now);
            self.append(SessionEvent::SessionEnded {
                reason,
                duration: minutes,
            });
            self.release();
            metrics::record_session_ended(reason);
            info!(
                session_id = %self.session_id,
                reason = reason.as_str(),
                duration_minutes = minutes,
                "session ended"
            );
        }
        self.dispatch(&[Signal::Ended(reason)]);
        true
    }

    /// Records the student's email.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidFormat` for a malformed email and
    /// `IdentityError::AlreadySet` if an email was already recorded. Neither
    /// changes the session.
    pub fn provide_identity(&self, email: &str) -> Result<(), IdentityError> {
        let email = validate_email(email)?;
        let mut state = self.state();
        state.set_identity(email.to_string())?;
        self.append(SessionEvent::EmailProvided {
            email: email.to_string(),
        });
        debug!(session_id = %self.session_id, "student identity recorded");
        Ok(())
    }

    /// Clears an outstanding warning so the session reads `Active` again.
    pub fn acknowledge_warning(&self) -> bool {
        let acknowledged = self.state().acknowledge_warning();
        if acknowledged {
            if let Some(markers) = &self.markers {
                markers.mark_acknowledged(&self.session_id);
            }
            debug!(session_id = %self.session_id, "warning acknowledged");
        }
        acknowledged
    }

    /// Reports that the embedded form failed to load.
    ///
    /// Display-only: the session state is left untouched.
    pub fn form_load_failed(&self, reason: impl Into<String>) -> FormLoadError {
        let err = FormLoadError {
            url: self.config.form_url.clone(),
            reason: reason.into(),
        };
        warn!(session_id = %self.session_id, error = %err, "form failed to load");
        err
    }

    /// Read-only status snapshot.
    #[must_use]
    pub fn status(&self) -> StatusView {
        self.status_at(Instant::now())
    }

    /// [`status`](Self::status) evaluated at `now`.
    ///
    /// Remaining time is reported only while the session is running.
    #[must_use]
    pub fn status_at(&self, now: Instant) -> StatusView {
        let state = self.state();
        let remaining = self
            .countdown
            .filter(|_| !state.status().is_terminal())
            .map(|c| c.remaining_at(now));
        StatusView {
            session_id: self.session_id.clone(),
            violation_count: state.violation_count(),
            max_violations: self.config.allowed_violations,
            status: state.status(),
            remaining_seconds: remaining.map(|r| r.as_secs()),
            time_band: remaining.map(TimeBand::classify),
            violation_band: ViolationBand::classify(
                state.violation_count(),
                self.config.allowed_violations,
            ),
            lock_reason: state.lock_reason(),
        }
    }

    /// Evaluates the countdown at `now`.
    ///
    /// Signals a tick while time remains and locks with `TimeExpired` once
    /// it runs out. Returns `None` when there is no countdown or the
    /// session is already terminal.
    pub fn on_timer_tick(&self, now: Instant) -> Option<Tick> {
        let countdown = self.countdown?;
        let (tick, signal) = {
            let mut state = self.state();
            if state.status().is_terminal() {
                return None;
            }
            match countdown.tick_at(now) {
                Tick::Remaining(remaining) => {
                    let secs = remaining.as_secs();
                    trace!(session_id = %self.session_id, remaining_seconds = secs, "tick");
                    (Tick::Remaining(remaining), Signal::Tick(secs, TimeBand::classify(remaining)))
                }
                Tick::Expired => {
                    state.lock(LockReason::TimeExpired);
                    (
                        Tick::Expired,
                        self.locked_effects(&state, LockReason::TimeExpired, now),
                    )
                }
            }
        };
        self.dispatch(&[signal]);
        Some(tick)
    }

    /// Spawns the countdown task.
    ///
    /// Ticks once per [`TICK_INTERVAL`] until the session is terminal. Each
    /// tick runs on the blocking pool, as an expiring tick writes the event
    /// log. The task holds only a weak reference, so dropping the session
    /// stops it.
    /// Returns `None` when the session has no time limit or is already
    /// terminal.
    pub fn start_timer(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.countdown?;
        if self.cancel.is_cancelled() {
            return None;
        }
        let session: Weak<Self> = Arc::downgrade(self);
        let cancel = self.cancel.clone();
        let session_id = self.session_id.clone();

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        debug!(session_id = %session_id, "countdown cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        let Some(session) = session.upgrade() else {
                            debug!(session_id = %session_id, "session dropped, countdown stopped");
                            break;
                        };
                        let now = Instant::now();
                        let tick = tokio::task::spawn_blocking(move || session.on_timer_tick(now)).await;
                        match tick {
                            Ok(Some(Tick::Remaining(_))) => {}
                            Ok(Some(Tick::Expired) | None) => break,
                            Err(e) => {
                                warn!(session_id = %session_id, error = %e, "countdown tick failed");
                                break;
                            }
                        }
                    }
                }
            }
        }))
    }

    /// Time left on the countdown, if any.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.countdown.map(|c| c.remaining_at(Instant::now()))
    }
}
