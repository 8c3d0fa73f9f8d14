//! Event log inspection commands

use std::fs;

use serde_json::json;
use tracing::info;

use crate::cli::args::{EventsExportArgs, EventsListArgs, EventsStatsArgs, OutputFormat};
use crate::error::FormWardenError;
use crate::events::EventLog;
use crate::report::{self, CountClass};
use crate::store::{ConfigStore, FileStore};

/// Lists logged events.
///
/// # Errors
///
/// Returns a store error if the file cannot be read.
pub fn list(args: &EventsListArgs) -> Result<(), FormWardenError> {
    let store = FileStore::open(&args.store.path);
    let entries = store.read(args.session.as_deref())?;

    match args.format {
        OutputFormat::Human => {
            if entries.is_empty() {
                println!("No events recorded yet.");
            }
            for entry in &entries {
                let payload = serde_json::to_value(&entry.event)?;
                println!(
                    "{}  {}  {:<18} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.session_id,
                    entry.event_type(),
                    payload["payload"]
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(())
}

/// Prints totals, per-session summaries and recent violations.
///
/// # Errors
///
/// Returns a store error if the file cannot be read.
pub fn stats(args: &EventsStatsArgs) -> Result<(), FormWardenError> {
    let store = FileStore::open(&args.store.path);
    let links = store.list_configs()?.len();
    let entries = store.read(None)?;

    let totals = report::statistics(links, &entries);
    let sessions = report::summarize_sessions(&entries, args.sessions);
    let violations = report::recent_violations(&entries, args.violations);

    match args.format {
        OutputFormat::Json => {
            let out = json!({
                "statistics": totals,
                "sessions": sessions,
                "recentViolations": violations,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Human => {
            println!("Links:      {}", totals.total_links);
            println!("Sessions:   {}", totals.total_sessions);
            println!("Violations: {}", totals.total_violations);
            println!("Locked:     {}", totals.locked_sessions);

            println!();
            if sessions.is_empty() {
                println!("No sessions recorded yet.");
            } else {
                println!(
                    "{:<32} {:<24} {:<20} {:>10} {:<10} {:>8}",
                    "SESSION", "STUDENT", "STARTED", "VIOLATIONS", "STATUS", "DURATION"
                );
                for s in &sessions {
                    println!(
                        "{:<32} {:<24} {:<20} {:>10} {:<10} {:>8}",
                        s.session_id,
                        s.student_email.as_deref().unwrap_or("Not provided"),
                        s.started_at.map_or_else(
                            || "Unknown".to_string(),
                            |t| t.format("%Y-%m-%d %H:%M:%S").to_string()
                        ),
                        s.violations,
                        s.status,
                        s.duration_minutes
                            .map_or_else(|| "Ongoing".to_string(), |m| format!("{m} min")),
                    );
                }
            }

            println!();
            if violations.is_empty() {
                println!("No violations recorded yet.");
            } else {
                println!(
                    "{:<20} {:<32} {:<24} {:<20} {:>5}",
                    "TIME", "SESSION", "STUDENT", "KIND", "COUNT"
                );
                for v in &violations {
                    let marker = match CountClass::of(v.count) {
                        CountClass::Low => "",
                        CountClass::Medium => " !",
                        CountClass::High => " !!",
                    };
                    println!(
                        "{:<20} {:<32} {:<24} {:<20} {:>5}{marker}",
                        v.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        v.session_id,
                        v.student_email.as_deref().unwrap_or("Not provided"),
                        v.kind.label(),
                        v.count,
                    );
                }
            }
        }
    }
    Ok(())
}

/// Exports links, analytics and events as JSON.
///
/// # Errors
///
/// Returns a store error if the file cannot be read, or an I/O error if
/// the output file cannot be written.
pub fn export(args: &EventsExportArgs) -> Result<(), FormWardenError> {
    let store = FileStore::open(&args.store.path);
    let snapshot = report::export(&store)?;
    let json = serde_json::to_string_pretty(&snapshot)?;

    match &args.output {
        Some(path) => {
            fs::write(path, json)?;
            info!(path = %path.display(), "export written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
