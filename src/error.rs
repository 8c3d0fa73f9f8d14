//! Error types for `FormWarden`
//!
//! Domain errors for configuration, identity, sessions and persistence,
//! aggregated into [`FormWardenError`] which maps onto process exit codes.

use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `FormWarden` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid link, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (store unreadable, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Session error (identity rejected)
    pub const SESSION_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `FormWarden` operations.
#[derive(Debug, Error)]
pub enum FormWardenError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Session start or identity error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Persistence layer error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormWardenError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Session(SessionError::InvalidConfiguration(_)) => ExitCode::CONFIG_ERROR,
            Self::Session(SessionError::Identity(_)) => ExitCode::SESSION_ERROR,
            Self::Store(_) | Self::Io(_) => ExitCode::IO_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// Every variant is an "invalid configuration" in the session sense:
/// no session is created when one of these is returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required field is missing or empty
    #[error("missing required field '{field}'")]
    MissingRequired {
        /// Name of the missing field
        field: String,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Configuration validation failed with one or more issues
    #[error("configuration rejected: {}", format_issues(.errors))]
    ValidationError {
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Encoded configuration bundle could not be decoded
    #[error("invalid configuration bundle: {0}")]
    Decode(String),

    /// No configuration stored under the given id
    #[error("configuration not found: {id}")]
    NotFound {
        /// The requested link id
        id: String,
    },

    /// The backing store could not be read
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Field the issue applies to (e.g., "allowedViolations")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the configuration from being used
    Error,
    /// Reported, but the configuration is still accepted
    Warning,
}

// ============================================================================
// Identity Errors
// ============================================================================

/// Student identity provision errors.
///
/// Both are recoverable: the caller re-prompts the student.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// An identity has already been recorded for this session
    #[error("student identity already set")]
    AlreadySet,

    /// The email does not have a `local@domain.tld` shape
    #[error("invalid email address: '{0}'")]
    InvalidFormat(String),
}

// ============================================================================
// Session Errors
// ============================================================================

/// Errors returned when starting a monitored session.
///
/// Transitions on a running session never fail; calls that would break
/// an invariant are absorbed as no-ops instead.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configuration is missing or out of policy bounds
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// The supplied student identity was rejected
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// The embedded form could not be displayed.
///
/// Non-fatal: reported to the student, never affects lock state.
#[derive(Debug, Clone, Error)]
#[error("failed to load the form at {url}: {reason}")]
pub struct FormLoadError {
    /// Form URL that failed to load
    pub url: String,
    /// Human-readable cause
    pub reason: String,
}

// ============================================================================
// Store Errors
// ============================================================================

/// Persistence layer errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error reading or writing the store file
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file is not valid JSON
    #[error("store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The store lock was poisoned by a panicking writer
    #[error("store lock poisoned")]
    Poisoned,
}
