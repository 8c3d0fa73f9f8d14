//! Observability
//!
//! Structured logging and Prometheus metrics for monitored sessions and
//! instructor operations.

pub mod logging;
pub mod metrics;

pub use logging::{LogFormat, init_logging};
pub use metrics::init_metrics;
