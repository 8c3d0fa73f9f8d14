//! Property tests over random session input sequences.

use std::sync::Arc;
use std::time::Duration;

use formwarden::config::Configuration;
use formwarden::events::{EventLog, EventType, MemoryEventLog, SessionEvent};
use formwarden::session::{
    EndReason, LockReason, ResumeMarkers, SessionBuilder, SessionState, SessionStatus,
    ViolationKind,
};
use proptest::prelude::*;
use tokio::time::Instant;

/// One step of simulated page activity.
#[derive(Debug, Clone)]
enum Step {
    Violation(ViolationKind),
    Acknowledge,
    Wait(u64),
    Tick,
    Lock,
    End,
}

fn arb_kind() -> impl Strategy<Value = ViolationKind> {
    prop::sample::select(ViolationKind::ALL.to_vec())
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => arb_kind().prop_map(Step::Violation),
        2 => Just(Step::Acknowledge),
        2 => (1u64..400).prop_map(Step::Wait),
        2 => Just(Step::Tick),
        1 => Just(Step::Lock),
        1 => Just(Step::End),
    ]
}

fn arb_config() -> impl Strategy<Value = Configuration> {
    (1u32..=10, prop::option::of(5u32..=20)).prop_map(|(allowed, minutes)| {
        Configuration::new("https://docs.google.com/forms/d/p", allowed, minutes, false)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The count never decreases, never passes the threshold, and stops
    /// moving once the session is terminal.
    #[test]
    fn prop_count_monotonic_and_frozen(
        config in arb_config(),
        steps in prop::collection::vec(arb_step(), 0..40),
    ) {
        let allowed = config.allowed_violations;
        let session = SessionBuilder::new(config).start().unwrap();
        let mut now = session.started_at();
        let mut last_count = 0;
        let mut terminal: Option<(SessionStatus, u32)> = None;

        for step in steps {
            match step {
                Step::Violation(kind) => { session.record_violation_at(kind, now); }
                Step::Acknowledge => { session.acknowledge_warning(); }
                Step::Wait(secs) => now += Duration::from_secs(secs),
                Step::Tick => { session.on_timer_tick(now); }
                Step::Lock => { session.lock_at(LockReason::TimeExpired, now); }
                Step::End => { session.end_at(EndReason::Explicit, now); }
            }
            let view = session.status_at(now);
            prop_assert!(view.violation_count >= last_count);
            prop_assert!(view.violation_count <= allowed);
            if let Some(frozen) = terminal {
                prop_assert_eq!((view.status, view.violation_count), frozen);
            } else if view.status.is_terminal() {
                terminal = Some((view.status, view.violation_count));
            }
            last_count = view.violation_count;
        }
    }

    /// The log holds at most one warning and one terminal event, and
    /// replaying it together with the page markers reproduces the live
    /// state exactly.
    #[test]
    fn prop_log_is_consistent(
        config in arb_config(),
        steps in prop::collection::vec(arb_step(), 0..40),
    ) {
        let log = Arc::new(MemoryEventLog::new());
        let markers = Arc::new(ResumeMarkers::new());
        let session = SessionBuilder::new(config.clone())
            .event_log(log.clone())
            .resume_markers(markers.clone())
            .start()
            .unwrap();
        let mut now: Instant = session.started_at();

        for step in steps {
            match step {
                Step::Violation(kind) => { session.record_violation_at(kind, now); }
                Step::Acknowledge => { session.acknowledge_warning(); }
                Step::Wait(secs) => now += Duration::from_secs(secs),
                Step::Tick => { session.on_timer_tick(now); }
                Step::Lock => { session.lock_at(LockReason::MaxViolationsExceeded, now); }
                Step::End => { session.end_at(EndReason::PageUnload, now); }
            }
        }

        let entries = log.read(Some(session.session_id())).unwrap();
        let count = |t: EventType| entries.iter().filter(|e| e.event_type() == t).count();
        prop_assert_eq!(count(EventType::SessionStarted), 1);
        prop_assert!(count(EventType::Warned) <= 1);
        prop_assert!(count(EventType::SessionLocked) + count(EventType::SessionEnded) <= 1);

        let violations: Vec<u32> = entries
            .iter()
            .filter_map(|e| match e.event {
                SessionEvent::ViolationRecorded { count, .. } => Some(count),
                _ => None,
            })
            .collect();
        let expected: Vec<u32> = (1..=u32::try_from(violations.len()).unwrap()).collect();
        prop_assert_eq!(violations, expected);

        let live = session.snapshot();
        let replayed = if live.status().is_terminal() {
            prop_assert!(!markers.can_resume(session.session_id()));
            SessionState::replay(entries.iter().map(|e| &e.event))
        } else {
            SessionBuilder::new(config)
                .event_log(log.clone())
                .resume_markers(markers)
                .session_id(session.session_id())
                .start()
                .unwrap()
                .snapshot()
        };
        prop_assert_eq!(replayed.status(), live.status());
        prop_assert_eq!(replayed.violation_count(), live.violation_count());
        prop_assert_eq!(replayed.warning_shown(), live.warning_shown());
    }
}
