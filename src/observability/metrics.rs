//! Metrics collection.
//!
//! Prometheus-compatible counters and gauges for session outcomes. Every
//! label value comes from a closed enum. Raw input never becomes a label.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::FormWardenError;
use crate::session::{EndReason, LockReason, ViolationKind};

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `FormWardenError::Io` if the recorder or HTTP listener cannot
/// be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), FormWardenError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| FormWardenError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "formwarden_violations_total",
        "Violations recorded, by kind"
    );
    describe_counter!("formwarden_sessions_started_total", "Sessions started");
    describe_counter!(
        "formwarden_sessions_locked_total",
        "Sessions locked, by reason"
    );
    describe_counter!(
        "formwarden_sessions_ended_total",
        "Sessions ended without a lock, by reason"
    );
    describe_gauge!(
        "formwarden_sessions_active",
        "Sessions started and not yet locked or ended"
    );
    describe_counter!(
        "formwarden_event_log_dropped_total",
        "Log entries discarded because the log was full"
    );
    describe_counter!("formwarden_links_created_total", "Links created");
    describe_counter!(
        "formwarden_input_rejected_total",
        "Unrecognized session input lines"
    );
}

/// Records a counted violation.
pub fn record_violation(kind: ViolationKind) {
    counter!("formwarden_violations_total", "kind" => kind.as_str()).increment(1);
}

/// Records a session start.
pub fn record_session_started() {
    counter!("formwarden_sessions_started_total").increment(1);
    gauge!("formwarden_sessions_active").increment(1.0);
}

/// Records a lock.
pub fn record_session_locked(reason: LockReason) {
    counter!("formwarden_sessions_locked_total", "reason" => reason.as_str()).increment(1);
    gauge!("formwarden_sessions_active").decrement(1.0);
}

/// Records an end without lock.
pub fn record_session_ended(reason: EndReason) {
    counter!("formwarden_sessions_ended_total", "reason" => reason.as_str()).increment(1);
    gauge!("formwarden_sessions_active").decrement(1.0);
}

/// Records log entries discarded to stay within capacity.
pub fn record_log_truncated(dropped: usize) {
    counter!("formwarden_event_log_dropped_total")
        .increment(u64::try_from(dropped).unwrap_or(u64::MAX));
}

/// Records a created link.
pub fn record_link_created() {
    counter!("formwarden_links_created_total").increment(1);
}

/// Records a session input line that was not understood.
///
/// The line itself goes to the log, not to a label.
pub fn record_input_rejected() {
    counter!("formwarden_input_rejected_total").increment(1);
}
