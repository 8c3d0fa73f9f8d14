//! Shared integration-test harness for running the `formwarden` binary as
//! a child process.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};

/// Default timeout for reading a single line from the process.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variables that would leak host configuration into tests.
const ISOLATED_ENV: [&str; 7] = [
    "FORMWARDEN_STORE",
    "FORMWARDEN_BASE_URL",
    "FORMWARDEN_COLOR",
    "FORMWARDEN_EMAIL",
    "FORMWARDEN_LOG_LEVEL",
    "FORMWARDEN_LOG_FORMAT",
    "FORMWARDEN_METRICS_PORT",
];

fn command(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_formwarden"));
    cmd.args(args);
    for var in ISOLATED_ENV {
        cmd.env_remove(var);
    }
    cmd
}

/// Parses every non-empty stdout line as JSON.
#[allow(clippy::missing_panics_doc)]
pub fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            serde_json::from_str(l).unwrap_or_else(|e| panic!("invalid JSON line: {e}\n{l}"))
        })
        .collect()
}

/// A running `formwarden session run` process.
///
/// The child process is killed on drop via `kill_on_drop(true)`.
pub struct FormWardenProcess {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
}

impl FormWardenProcess {
    /// Runs the binary to completion with `args` and returns its output.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_command(args: &[&str]) -> Output {
        command(args)
            .stdin(Stdio::null())
            .output()
            .expect("failed to run formwarden")
    }

    /// Runs the binary to completion, feeding `input` on stdin.
    #[allow(clippy::missing_panics_doc)]
    pub fn run_with_input(args: &[&str], input: &str) -> Output {
        let mut child = command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn formwarden");
        child
            .stdin
            .take()
            .expect("stdin not captured")
            .write_all(input.as_bytes())
            .expect("failed to write stdin");
        child.wait_with_output().expect("failed to wait for formwarden")
    }

    /// Starts an interactive session against the store at `store`.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_session(store: &Path, source: &[&str]) -> Self {
        let mut args = vec![
            "--quiet",
            "session",
            "run",
            "--store",
            store.to_str().expect("non-UTF-8 store path"),
        ];
        args.extend_from_slice(source);

        let mut child = tokio::process::Command::from(command(&args))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn formwarden");

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
        }
    }

    /// Writes one input line.
    #[allow(clippy::missing_panics_doc)]
    pub async fn send_line(&mut self, line: &str) {
        self.stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("failed to write to stdin");
        self.stdin.flush().await.expect("failed to flush stdin");
    }

    /// Reads one JSON line from stdout.
    ///
    /// Panics on EOF, I/O error, or if nothing arrives within `timeout`.
    #[allow(clippy::missing_panics_doc)]
    pub async fn read_message(&mut self, timeout: Duration) -> Value {
        let mut line = String::new();
        let result = tokio::time::timeout(timeout, async {
            loop {
                line.clear();
                let n = self
                    .reader
                    .read_line(&mut line)
                    .await
                    .expect("read_line I/O error");
                assert!(n > 0, "unexpected EOF from formwarden");
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    return serde_json::from_str::<Value>(trimmed)
                        .unwrap_or_else(|e| panic!("invalid JSON: {e}\nline: {line}"));
                }
            }
        })
        .await;
        result.expect("timed out waiting for output")
    }

    /// Reads lines until one has the given `type`.
    #[allow(clippy::missing_panics_doc)]
    pub async fn expect_type(&mut self, expected: &str) -> Value {
        loop {
            let msg = self.read_message(DEFAULT_TIMEOUT).await;
            if msg.get("type").and_then(Value::as_str) == Some(expected) {
                return msg;
            }
        }
    }

    /// Closes stdin and waits for exit, returning the exit code.
    #[allow(clippy::missing_panics_doc)]
    pub async fn shutdown(self) -> Option<i32> {
        let Self {
            mut child, stdin, ..
        } = self;
        drop(stdin);

        match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
            Ok(status) => status.expect("failed to wait for child").code(),
            Err(_) => {
                child.kill().await.expect("failed to kill child");
                None
            }
        }
    }
}
