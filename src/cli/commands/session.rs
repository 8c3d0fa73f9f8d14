//! `session run`: a monitored session driven from stdin.
//!
//! Each stdin line is a detected violation or a control word. Everything
//! the session reports goes to stdout as one JSON object per line; logs
//! stay on stderr.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::args::SessionRunArgs;
use crate::cli::commands::link::{classify, load_target};
use crate::config::Configuration;
use crate::config::loader::LinkTarget;
use crate::error::FormWardenError;
use crate::observability::{init_metrics, metrics};
use crate::session::{
    EndReason, LockReason, MonitoredSession, SessionBuilder, SessionObserver, StatusView,
    TimeBand, ViolationKind, format_mmss,
};
use crate::store::FileStore;

/// One line of session output.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Output<'a> {
    Started {
        session_id: &'a str,
        allowed_violations: u32,
        session_duration_minutes: Option<u32>,
    },
    Status(StatusView),
    Warning {
        violation_count: u32,
        remaining: u32,
    },
    Locked {
        final_count: u32,
        duration_minutes: u64,
        reason: LockReason,
    },
    Tick {
        remaining_seconds: u64,
        display: String,
        band: TimeBand,
    },
    Ended {
        reason: EndReason,
    },
    FormLoadFailed {
        error: String,
    },
    Rejected {
        input: &'a str,
        error: String,
    },
}

fn emit(output: &Output<'_>) {
    let Ok(line) = serde_json::to_string(output) else {
        return;
    };
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{line}");
    let _ = stdout.flush();
}

/// Prints session signals as JSON lines.
struct ConsoleObserver {
    allowed_violations: u32,
    ticks: bool,
}

impl SessionObserver for ConsoleObserver {
    fn on_warning(&self, violation_count: u32) {
        emit(&Output::Warning {
            violation_count,
            remaining: self.allowed_violations.saturating_sub(violation_count),
        });
    }

    fn on_locked(&self, final_count: u32, duration_minutes: u64, reason: LockReason) {
        emit(&Output::Locked {
            final_count,
            duration_minutes,
            reason,
        });
    }

    fn on_timer_tick(&self, remaining_seconds: u64, band: TimeBand) {
        if self.ticks {
            emit(&Output::Tick {
                remaining_seconds,
                display: format_mmss(std::time::Duration::from_secs(remaining_seconds)),
                band,
            });
        }
    }

    fn on_ended(&self, reason: EndReason) {
        emit(&Output::Ended { reason });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Applies one input line to the session.
fn handle_line(session: &MonitoredSession, line: &str) -> Flow {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Flow::Continue;
    }
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    match word.to_ascii_lowercase().as_str() {
        "ack" => {
            session.acknowledge_warning();
            emit(&Output::Status(session.status()));
        }
        "status" => emit(&Output::Status(session.status())),
        "end" => {
            session.end(EndReason::Explicit);
            return Flow::Stop;
        }
        "email" => match session.provide_identity(rest) {
            Ok(()) => emit(&Output::Status(session.status())),
            Err(e) => emit(&Output::Rejected {
                input: line,
                error: e.to_string(),
            }),
        },
        "load-failed" => {
            let err = session.form_load_failed(rest);
            emit(&Output::FormLoadFailed {
                error: err.to_string(),
            });
        }
        _ => match line.parse::<ViolationKind>() {
            Ok(kind) => {
                session.record_violation(kind);
                emit(&Output::Status(session.status()));
            }
            Err(e) => {
                metrics::record_input_rejected();
                warn!(input = line, "unrecognized session input");
                emit(&Output::Rejected {
                    input: line,
                    error: e.to_string(),
                });
            }
        },
    }
    Flow::Continue
}

fn resolve_config(store: &FileStore, args: &SessionRunArgs) -> Result<Configuration, FormWardenError> {
    let target = if let Some(id) = &args.id {
        LinkTarget::Id(id.clone())
    } else if let Some(bundle) = &args.bundle {
        LinkTarget::Bundle(bundle.clone())
    } else if let Some(url) = &args.url {
        classify(url)?
    } else {
        return Err(FormWardenError::Usage(
            "one of --id, --bundle or --url is required".to_string(),
        ));
    };
    Ok(load_target(store, target)?)
}

/// Runs a session until stdin closes, the session locks, or Ctrl+C.
///
/// # Errors
///
/// Returns a configuration error if the link cannot be resolved, a usage
/// error if the link requires an email and none was given, and a session
/// error if the email is malformed.
pub async fn run(args: &SessionRunArgs) -> Result<(), FormWardenError> {
    if args.metrics_port.is_some() {
        init_metrics(args.metrics_port)?;
    }

    let store = Arc::new(FileStore::open(&args.store.path));
    let config = resolve_config(&store, args)?;
    if config.require_email && args.email.is_none() {
        return Err(FormWardenError::Usage(
            "this link requires a student email (--email)".to_string(),
        ));
    }

    let observer = Arc::new(ConsoleObserver {
        allowed_violations: config.allowed_violations,
        ticks: args.ticks,
    });
    let mut builder = SessionBuilder::new(config)
        .event_log(store.clone())
        .observer(observer);
    if let Some(email) = &args.email {
        builder = builder.identity(email.clone());
    }
    let session = Arc::new(builder.start()?);

    emit(&Output::Started {
        session_id: session.session_id(),
        allowed_violations: session.config().allowed_violations,
        session_duration_minutes: session.config().session_duration_minutes,
    });
    emit(&Output::Status(session.status()));

    let timer = session.start_timer();
    let cancel = session.cancellation_token();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("session reached a terminal status");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, ending session");
                break;
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if handle_line(&session, &line) == Flow::Stop {
                            break;
                        }
                    }
                    None => {
                        debug!("input closed");
                        break;
                    }
                }
            }
        }
    }

    session.end(EndReason::PageUnload);
    if let Some(handle) = timer {
        let _ = handle.await;
    }
    emit(&Output::Status(session.status()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemoryEventLog;
    use crate::session::SessionStatus;

    fn session(allowed: u32) -> MonitoredSession {
        SessionBuilder::new(Configuration::new(
            "https://docs.google.com/forms/d/a",
            allowed,
            None,
            false,
        ))
        .event_log(Arc::new(MemoryEventLog::new()))
        .start()
        .unwrap()
    }

    #[tokio::test]
    async fn test_violation_lines_count() {
        let s = session(3);
        assert_eq!(handle_line(&s, "tab_switch"), Flow::Continue);
        assert_eq!(handle_line(&s, "  Copy-Blocked "), Flow::Continue);
        assert_eq!(s.status().violation_count, 2);
    }

    #[tokio::test]
    async fn test_unknown_and_blank_lines_ignored() {
        let s = session(3);
        assert_eq!(handle_line(&s, ""), Flow::Continue);
        assert_eq!(handle_line(&s, "# comment"), Flow::Continue);
        assert_eq!(handle_line(&s, "sneeze"), Flow::Continue);
        assert_eq!(s.status().violation_count, 0);
    }

    #[tokio::test]
    async fn test_control_words() {
        let s = session(3);
        handle_line(&s, "focus_loss");
        assert_eq!(s.status().status, SessionStatus::Warned);
        handle_line(&s, "ack");
        assert_eq!(s.status().status, SessionStatus::Active);

        handle_line(&s, "email student@uni.edu");
        assert_eq!(s.snapshot().student_identity(), Some("student@uni.edu"));

        assert_eq!(handle_line(&s, "end"), Flow::Stop);
        assert_eq!(s.status().status, SessionStatus::Ended);
    }

    #[test]
    fn test_output_shape() {
        let json = serde_json::to_value(Output::Locked {
            final_count: 3,
            duration_minutes: 2,
            reason: LockReason::MaxViolationsExceeded,
        })
        .unwrap();
        assert_eq!(json["type"], "locked");
        assert_eq!(json["reason"], "max_violations_exceeded");
    }
}
