//! Configuration validation
//!
//! Validation collects ALL issues (doesn't stop at the first) so the
//! instructor sees everything wrong with a link in one pass.
//!
//! Two entry points exist. [`Validator::validate_session`] runs before a
//! session is constructed, whatever transport delivered the
//! configuration. [`Validator::validate_creation`] adds the form URL checks
//! the instructor flow applies when a link is first created.

use url::Url;

use crate::config::schema::{
    Configuration, MAX_ALLOWED_VIOLATIONS, MAX_SESSION_MINUTES, MIN_ALLOWED_VIOLATIONS,
    MIN_SESSION_MINUTES,
};
use crate::error::{ConfigError, Severity, ValidationIssue};

/// Host that serves embeddable forms.
const FORMS_HOST: &str = "docs.google.com";

/// Path prefix of embeddable forms on [`FORMS_HOST`].
const FORMS_PATH_PREFIX: &str = "/forms/";

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent use).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Converts into a `Result`, keeping warnings on success.
    ///
    /// A single missing field is reported as `MissingRequired` so callers
    /// get the field name directly; anything else becomes a
    /// `ValidationError` listing every issue.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when at least one error was collected.
    pub fn into_result(self) -> Result<Vec<ValidationIssue>, ConfigError> {
        match self.errors.as_slice() {
            [] => Ok(self.warnings),
            [only] if only.message == MISSING => Err(ConfigError::MissingRequired {
                field: only.path.clone(),
            }),
            _ => Err(ConfigError::ValidationError {
                errors: self.errors,
            }),
        }
    }
}

const MISSING: &str = "is required";

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
    strict: bool,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator that promotes warnings to errors.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Validates a configuration about to back a session.
    ///
    /// Checks required fields and policy bounds.
    pub fn validate_session(&mut self, config: &Configuration) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_required(config);
        self.validate_bounds(config);

        self.finish()
    }

    /// Validates a configuration the instructor is creating.
    ///
    /// Adds form URL checks on top of [`validate_session`](Self::validate_session).
    pub fn validate_creation(&mut self, config: &Configuration) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_required(config);
        self.validate_bounds(config);
        if !config.form_url.trim().is_empty() {
            self.validate_form_url(config.form_url.trim());
        }

        self.finish()
    }

    // ========================================================================
    // Checks
    // ========================================================================

    fn validate_required(&mut self, config: &Configuration) {
        if config.form_url.trim().is_empty() {
            self.add_error("formUrl", MISSING);
        }
        if config.allowed_violations == 0 {
            self.add_error("allowedViolations", MISSING);
        }
    }

    fn validate_bounds(&mut self, config: &Configuration) {
        let allowed = config.allowed_violations;
        if allowed != 0 && !(MIN_ALLOWED_VIOLATIONS..=MAX_ALLOWED_VIOLATIONS).contains(&allowed) {
            self.add_error(
                "allowedViolations",
                &format!(
                    "must be between {MIN_ALLOWED_VIOLATIONS} and {MAX_ALLOWED_VIOLATIONS}, got {allowed}"
                ),
            );
        }

        if let Some(minutes) = config.session_duration_minutes {
            if !(MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&minutes) {
                self.add_error(
                    "sessionDurationMinutes",
                    &format!(
                        "must be between {MIN_SESSION_MINUTES} and {MAX_SESSION_MINUTES} minutes, got {minutes}"
                    ),
                );
            }
        }
    }

    fn validate_form_url(&mut self, url: &str) {
        let Ok(parsed) = Url::parse(url) else {
            self.add_error("formUrl", "is not a valid URL");
            return;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            self.add_error("formUrl", "must be an http:// or https:// URL");
            return;
        }
        let Some(host) = parsed.host_str() else {
            self.add_error("formUrl", "has no host");
            return;
        };

        if !host.eq_ignore_ascii_case(FORMS_HOST) || !parsed.path().starts_with(FORMS_PATH_PREFIX) {
            self.add_warning(
                "formUrl",
                &format!("does not look like a form link (expected https://{FORMS_HOST}{FORMS_PATH_PREFIX}...)"),
            );
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        let severity = if self.strict {
            Severity::Error
        } else {
            Severity::Warning
        };
        let issue = ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity,
        };
        if self.strict {
            self.errors.push(issue);
        } else {
            self.warnings.push(issue);
        }
    }

    fn finish(&mut self) -> ValidationResult {
        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Configuration {
        Configuration::new("https://docs.google.com/forms/d/e/abc/viewform", 3, Some(30), false)
    }

    #[test]
    fn test_valid_config_passes() {
        let result = Validator::new().validate_creation(&valid());
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_form_url_reports_field() {
        let mut config = valid();
        config.form_url = "  ".to_string();
        let err = Validator::new()
            .validate_session(&config)
            .into_result()
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingRequired { ref field } if field == "formUrl"),
            "{err:?}"
        );
    }

    #[test]
    fn test_zero_violations_is_missing() {
        let mut config = valid();
        config.allowed_violations = 0;
        let result = Validator::new().validate_session(&config);
        assert!(result.has_errors());
        assert_eq!(result.errors[0].path, "allowedViolations");
    }

    #[test]
    fn test_threshold_bounds() {
        for (value, ok) in [(1, true), (10, true), (11, false), (100, false)] {
            let mut config = valid();
            config.allowed_violations = value;
            let result = Validator::new().validate_session(&config);
            assert_eq!(result.is_valid(), ok, "allowedViolations = {value}");
        }
    }

    #[test]
    fn test_duration_bounds() {
        for (value, ok) in [(None, true), (Some(5), true), (Some(300), true), (Some(4), false), (Some(301), false)] {
            let mut config = valid();
            config.session_duration_minutes = value;
            let result = Validator::new().validate_session(&config);
            assert_eq!(result.is_valid(), ok, "sessionDurationMinutes = {value:?}");
        }
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.form_url = String::new();
        config.allowed_violations = 42;
        config.session_duration_minutes = Some(1);
        let result = Validator::new().validate_session(&config);
        assert_eq!(result.errors.len(), 3);
        assert!(matches!(
            result.into_result(),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_non_http_scheme_rejected_at_creation() {
        let mut config = valid();
        config.form_url = "javascript:alert(1)".to_string();
        assert!(Validator::new().validate_creation(&config).has_errors());
        // Session-time validation treats the URL as opaque
        assert!(Validator::new().validate_session(&config).is_valid());
    }

    #[test]
    fn test_foreign_host_is_warning() {
        let mut config = valid();
        config.form_url = "https://example.com/survey".to_string();
        let result = Validator::new().validate_creation(&config);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_strict_promotes_warning() {
        let mut config = valid();
        config.form_url = "https://example.com/survey".to_string();
        let result = Validator::strict().validate_creation(&config);
        assert!(result.has_errors());
        assert_eq!(result.errors[0].severity, Severity::Error);
    }

    #[test]
    fn test_form_url_host_and_path_checks() {
        for (url, errors, warnings) in [
            ("https://docs.google.com/forms/d/1", 0, 0),
            ("https://DOCS.GOOGLE.COM/forms/d/1", 0, 0),
            ("http://user@docs.google.com:8080/forms/d/1", 0, 0),
            ("https://docs.google.com/spreadsheets/d/1", 0, 1),
            ("ftp://docs.google.com/forms/d/1", 1, 0),
            ("docs.google.com/forms/d/1", 1, 0),
        ] {
            let mut config = valid();
            config.form_url = url.to_string();
            let result = Validator::new().validate_creation(&config);
            assert_eq!(result.errors.len(), errors, "errors for {url}");
            assert_eq!(result.warnings.len(), warnings, "warnings for {url}");
        }
    }
}
