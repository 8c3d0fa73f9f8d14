//! End-to-end tests that run the `formwarden` binary.

mod common;

use std::path::Path;

use common::{DEFAULT_TIMEOUT, FormWardenProcess, json_lines};
use serde_json::Value;

const FORM: &str = "https://docs.google.com/forms/d/e/quiz/viewform";

fn store_arg(path: &Path) -> &str {
    path.to_str().expect("non-UTF-8 temp path")
}

fn create_link(store: &Path, extra: &[&str]) -> Value {
    let mut args = vec![
        "--quiet",
        "link",
        "create",
        FORM,
        "--format",
        "json",
        "--base-url",
        "https://proctor.example/",
        "--store",
        store_arg(store),
    ];
    args.extend_from_slice(extra);
    let output = FormWardenProcess::spawn_command(&args);
    assert!(
        output.status.success(),
        "link create failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("link create output is JSON")
}

// ============================================================================
// Simple commands
// ============================================================================

#[test]
fn test_version_json() {
    let output = FormWardenProcess::spawn_command(&["version", "--format", "json"]);
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "formwarden");
    assert!(json["version"].is_string());
}

#[test]
fn test_completions_bash() {
    let output = FormWardenProcess::spawn_command(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("formwarden"));
}

#[test]
fn test_data_clear_requires_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");
    let output =
        FormWardenProcess::spawn_command(&["--quiet", "data", "clear", "--store", store_arg(&store)]);
    assert_eq!(output.status.code(), Some(64));
}

// ============================================================================
// Links
// ============================================================================

#[test]
fn test_link_create_decode_list_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");

    let link = create_link(&store, &["-n", "4", "-d", "30"]);
    let id = link["id"].as_str().unwrap().to_string();
    let url = link["url"].as_str().unwrap().to_string();
    assert!(id.starts_with("wrapper_"));
    assert!(url.starts_with("https://proctor.example/wrapper.html?config="));

    let decoded = FormWardenProcess::spawn_command(&[
        "--quiet",
        "link",
        "decode",
        &url,
        "--format",
        "json",
        "--store",
        store_arg(&store),
    ]);
    assert!(decoded.status.success());
    let config: Value = serde_json::from_slice(&decoded.stdout).unwrap();
    assert_eq!(config["allowedViolations"], 4);
    assert_eq!(config["sessionDurationMinutes"], 30);
    assert_eq!(config["formUrl"], FORM);

    let listed = FormWardenProcess::spawn_command(&[
        "--quiet",
        "link",
        "list",
        "--format",
        "json",
        "--store",
        store_arg(&store),
    ]);
    assert!(listed.status.success());
    let links: Value = serde_json::from_slice(&listed.stdout).unwrap();
    assert_eq!(links.as_array().unwrap().len(), 1);
    assert_eq!(links[0]["id"], id.as_str());

    let deleted = FormWardenProcess::spawn_command(&[
        "--quiet",
        "link",
        "delete",
        &id,
        "--store",
        store_arg(&store),
    ]);
    assert!(deleted.status.success());

    let missing = FormWardenProcess::spawn_command(&[
        "--quiet",
        "link",
        "delete",
        &id,
        "--store",
        store_arg(&store),
    ]);
    assert_eq!(missing.status.code(), Some(2));
}

#[test]
fn test_link_create_rejects_out_of_policy() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");
    let output = FormWardenProcess::spawn_command(&[
        "--quiet",
        "link",
        "create",
        FORM,
        "-n",
        "11",
        "--store",
        store_arg(&store),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!store.exists());
}

#[test]
fn test_link_create_strict_rejects_foreign_host() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");
    let output = FormWardenProcess::spawn_command(&[
        "--quiet",
        "link",
        "create",
        "https://forms.example.org/quiz",
        "--strict",
        "--store",
        store_arg(&store),
    ]);
    assert_eq!(output.status.code(), Some(2));
}

// ============================================================================
// Sessions
// ============================================================================

#[test]
fn test_session_locks_at_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");
    let link = create_link(&store, &[]);
    let id = link["id"].as_str().unwrap();

    let output = FormWardenProcess::run_with_input(
        &["--quiet", "session", "run", "--id", id, "--store", store_arg(&store)],
        "tab_switch\nack\ncopy-blocked\nfocus_loss\ntab_switch\n",
    );
    assert!(
        output.status.success(),
        "session run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let lines = json_lines(&output);
    let kinds: Vec<&str> = lines.iter().filter_map(|l| l["type"].as_str()).collect();
    assert_eq!(kinds.first(), Some(&"started"));
    assert_eq!(kinds.iter().filter(|k| **k == "warning").count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == "locked").count(), 1);
    assert!(!kinds.contains(&"ended"));

    let locked = lines.iter().find(|l| l["type"] == "locked").unwrap();
    assert_eq!(locked["final_count"], 3);
    assert_eq!(locked["reason"], "max_violations_exceeded");

    let last = lines.last().unwrap();
    assert_eq!(last["type"], "status");
    assert_eq!(last["status"], "locked");
    assert_eq!(last["violation_count"], 3);
}

#[test]
fn test_session_from_bundle_ends_on_eof() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");
    let link = create_link(&store, &[]);
    let url = link["url"].as_str().unwrap();

    let output = FormWardenProcess::run_with_input(
        &["--quiet", "session", "run", "--url", url, "--store", store_arg(&store)],
        "# nothing suspicious\nsneeze\nstatus\n",
    );
    assert!(output.status.success());

    let lines = json_lines(&output);
    assert!(lines.iter().any(|l| l["type"] == "rejected" && l["input"] == "sneeze"));
    let ended = lines.iter().find(|l| l["type"] == "ended").unwrap();
    assert_eq!(ended["reason"], "page_unload");
    assert_eq!(lines.last().unwrap()["status"], "ended");
}

#[test]
fn test_session_requires_email_when_link_does() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");
    let link = create_link(&store, &["--require-email"]);
    let id = link["id"].as_str().unwrap();

    let output = FormWardenProcess::run_with_input(
        &["--quiet", "session", "run", "--id", id, "--store", store_arg(&store)],
        "",
    );
    assert_eq!(output.status.code(), Some(64));

    let bad_email = FormWardenProcess::run_with_input(
        &[
            "--quiet",
            "session",
            "run",
            "--id",
            id,
            "--email",
            "not-an-email",
            "--store",
            store_arg(&store),
        ],
        "",
    );
    assert_eq!(bad_email.status.code(), Some(5));
}

#[test]
fn test_unknown_link_id_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");
    let output = FormWardenProcess::run_with_input(
        &[
            "--quiet",
            "session",
            "run",
            "--id",
            "wrapper_missing_abc123",
            "--store",
            store_arg(&store),
        ],
        "",
    );
    assert_eq!(output.status.code(), Some(2));
}

#[tokio::test]
async fn test_interactive_session_warning_then_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");
    let link = create_link(&store, &["-n", "5"]);
    let id = link["id"].as_str().unwrap().to_string();

    let mut proc = FormWardenProcess::spawn_session(&store, &["--id", &id]);
    let started = proc.expect_type("started").await;
    assert_eq!(started["allowed_violations"], 5);
    let session_id = started["session_id"].as_str().unwrap().to_string();

    proc.send_line("dev_tools_detected").await;
    let warning = proc.expect_type("warning").await;
    assert_eq!(warning["violation_count"], 1);
    assert_eq!(warning["remaining"], 4);
    let status = proc.read_message(DEFAULT_TIMEOUT).await;
    assert_eq!(status["status"], "warned");

    proc.send_line("end").await;
    let ended = proc.expect_type("ended").await;
    assert_eq!(ended["reason"], "explicit");
    assert_eq!(proc.shutdown().await, Some(0));

    let events = FormWardenProcess::spawn_command(&[
        "--quiet",
        "events",
        "list",
        "--session",
        &session_id,
        "--format",
        "json",
        "--store",
        store_arg(&store),
    ]);
    assert!(events.status.success());
    let entries: Value = serde_json::from_slice(&events.stdout).unwrap();
    let types: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["event"]["type"].as_str())
        .collect();
    assert_eq!(
        types,
        vec!["session_started", "violation_recorded", "warned", "session_ended"]
    );
}

// ============================================================================
// Reports
// ============================================================================

#[test]
fn test_events_stats_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");
    let link = create_link(&store, &["-n", "2"]);
    let id = link["id"].as_str().unwrap();

    let run = FormWardenProcess::run_with_input(
        &[
            "--quiet",
            "session",
            "run",
            "--id",
            id,
            "--email",
            "student@uni.edu",
            "--store",
            store_arg(&store),
        ],
        "tab_switch\nsave_blocked\n",
    );
    assert!(run.status.success());

    let stats = FormWardenProcess::spawn_command(&[
        "--quiet",
        "events",
        "stats",
        "--format",
        "json",
        "--store",
        store_arg(&store),
    ]);
    assert!(stats.status.success());
    let json: Value = serde_json::from_slice(&stats.stdout).unwrap();
    assert_eq!(json["statistics"]["totalLinks"], 1);
    assert_eq!(json["statistics"]["totalSessions"], 1);
    assert_eq!(json["statistics"]["totalViolations"], 2);
    assert_eq!(json["statistics"]["lockedSessions"], 1);
    assert_eq!(json["sessions"][0]["studentEmail"], "student@uni.edu");
    assert_eq!(json["sessions"][0]["status"], "locked");
    let kinds: Vec<&str> = json["recentViolations"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v["kind"].as_str())
        .collect();
    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&"save_blocked"));

    let out = dir.path().join("export.json");
    let export = FormWardenProcess::spawn_command(&[
        "--quiet",
        "events",
        "export",
        "--output",
        store_arg(&out),
        "--store",
        store_arg(&store),
    ]);
    assert!(export.status.success());
    let dump: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert!(dump["wrappers"][id].is_object());
    assert_eq!(dump["analytics"][0]["action"], "wrapper_created");
    // started, email, violation, warned, violation, locked
    assert_eq!(dump["sessionEvents"].as_array().unwrap().len(), 6);
}
