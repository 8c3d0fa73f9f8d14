//! Logging initialization.
//!
//! Structured logging via `tracing`, rendered for humans or as JSON on
//! stderr. `-v` flags raise the level of this crate only; dependencies stay
//! at `warn` until `-vvv`. `FORMWARDEN_LOG_LEVEL` replaces the whole filter.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable overriding the verbosity flags.
pub const LOG_LEVEL_ENV: &str = "FORMWARDEN_LOG_LEVEL";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

/// Filter directive for a `-v` count.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,formwarden=info",
        2 => "warn,formwarden=debug",
        _ => "trace",
    }
}

/// Builds the filter from an override value and the `-v` count.
///
/// An override that does not parse is ignored.
fn build_filter(override_value: Option<&str>, verbosity: u8) -> EnvFilter {
    override_value
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(verbosity_to_directive(verbosity)))
}

fn use_ansi(color: ColorChoice, stderr_is_terminal: bool, no_color: bool) -> bool {
    match color {
        ColorChoice::Auto => stderr_is_terminal && !no_color,
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}

/// Initializes the global tracing subscriber on stderr.
///
/// Stdout stays reserved for command output. Safe to call more than once.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let override_value = std::env::var(LOG_LEVEL_ENV).ok();
    let filter = build_filter(override_value.as_deref(), verbosity);
    let show_target = verbosity >= 2;

    match format {
        LogFormat::Human => {
            let ansi = use_ansi(
                color,
                std::io::stderr().is_terminal(),
                std::env::var_os("NO_COLOR").is_some(),
            );
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(ansi)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_only_this_crate() {
        assert_eq!(verbosity_to_directive(0), "warn");
        assert_eq!(verbosity_to_directive(1), "warn,formwarden=info");
        assert_eq!(verbosity_to_directive(2), "warn,formwarden=debug");
        assert_eq!(verbosity_to_directive(3), "trace");
        assert_eq!(verbosity_to_directive(u8::MAX), "trace");
    }

    #[test]
    fn override_replaces_verbosity() {
        let filter = build_filter(Some("formwarden::store=trace"), 0).to_string();
        assert_eq!(filter, EnvFilter::new("formwarden::store=trace").to_string());
        assert_ne!(filter, EnvFilter::new("warn").to_string());
    }

    #[test]
    fn unparsable_override_falls_back() {
        let filter = build_filter(Some("formwarden=loudest"), 1);
        assert_eq!(filter.to_string(), EnvFilter::new("warn,formwarden=info").to_string());
        assert_eq!(
            build_filter(None, 2).to_string(),
            EnvFilter::new("warn,formwarden=debug").to_string()
        );
    }

    #[test]
    fn ansi_follows_color_choice() {
        assert!(use_ansi(ColorChoice::Auto, true, false));
        assert!(!use_ansi(ColorChoice::Auto, true, true));
        assert!(!use_ansi(ColorChoice::Auto, false, false));
        assert!(use_ansi(ColorChoice::Always, false, true));
        assert!(!use_ansi(ColorChoice::Never, true, false));
    }

    #[test]
    fn init_logging_is_repeatable() {
        init_logging(LogFormat::Json, 2, ColorChoice::Never);
        init_logging(LogFormat::Human, 0, ColorChoice::Auto);
    }
}
