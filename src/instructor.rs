//! Instructor operations
//!
//! Creating, listing and deleting share links. A link is a stored
//! [`Configuration`] under a generated id plus a self-contained share URL
//! that carries the same configuration as an encoded bundle.

use chrono::Utc;
use tracing::{info, warn};

use crate::config::loader::{ID_PARAM, share_url, wrapper_url};
use crate::config::schema::DEFAULT_ALLOWED_VIOLATIONS;
use crate::config::{Configuration, Validator};
use crate::error::{ConfigError, StoreError, ValidationIssue};
use crate::observability::metrics;
use crate::session::identity::{random_base36, to_base36};
use crate::store::{AnalyticsAction, AnalyticsEntry, AnalyticsLog, ConfigStore, PolicySummary};

/// Prefix of every link id.
pub const LINK_ID_PREFIX: &str = "wrapper_";

/// Instructor input for a new link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLinkRequest {
    /// Form to embed.
    pub form_url: String,
    /// Lock threshold.
    pub allowed_violations: u32,
    /// Time limit in minutes. `Some(0)` means no limit.
    pub session_duration_minutes: Option<u32>,
    /// Whether students must give an email first.
    pub require_email: bool,
}

impl CreateLinkRequest {
    /// Request for `form_url` with the default threshold and no time limit.
    #[must_use]
    pub fn new(form_url: impl Into<String>) -> Self {
        Self {
            form_url: form_url.into(),
            allowed_violations: DEFAULT_ALLOWED_VIOLATIONS,
            session_duration_minutes: None,
            require_email: false,
        }
    }
}

/// A link that has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLink {
    /// Link id.
    pub id: String,
    /// Stored configuration.
    pub config: Configuration,
    /// Self-contained share URL.
    pub url: String,
    /// Non-fatal validation findings.
    pub warnings: Vec<ValidationIssue>,
}

/// Generates a link id: `wrapper_<base36 unix millis>_<6 base36 chars>`.
#[must_use]
pub fn generate_link_id() -> String {
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    format!("{LINK_ID_PREFIX}{}_{}", to_base36(millis), random_base36(6))
}

/// Share URL that refers to a stored link by id.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if `base_url` is not an absolute URL.
pub fn link_url_for_id(base_url: &str, id: &str) -> Result<String, ConfigError> {
    let mut url = wrapper_url(base_url)?;
    url.query_pairs_mut().append_pair(ID_PARAM, id);
    Ok(url.into())
}

/// Validates a request, stores it under a fresh id and returns the link.
///
/// A failure to write the analytics entry is logged and otherwise
/// ignored.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` or `ConfigError::MissingRequired`
/// when the request is out of policy, `ConfigError::InvalidValue` if
/// `base_url` is not an absolute URL, and `ConfigError::Store` if the
/// configuration cannot be saved.
pub fn create_link<S>(
    store: &S,
    request: CreateLinkRequest,
    base_url: &str,
    strict: bool,
) -> Result<CreatedLink, ConfigError>
where
    S: ConfigStore + AnalyticsLog + ?Sized,
{
    let config = Configuration::new(
        request.form_url.trim(),
        request.allowed_violations,
        request.session_duration_minutes.filter(|m| *m != 0),
        request.require_email,
    );

    let mut validator = if strict {
        Validator::strict()
    } else {
        Validator::new()
    };
    let warnings = validator.validate_creation(&config).into_result()?;
    for issue in &warnings {
        warn!(%issue, "link created with warning");
    }

    let id = generate_link_id();
    let config = config.with_id(&id);
    let url = share_url(base_url, &config)?;
    store.save_config(&id, &config)?;

    if let Err(e) = store.record_analytics(AnalyticsEntry {
        id: id.clone(),
        action: AnalyticsAction::WrapperCreated,
        timestamp: Utc::now(),
        config: Some(PolicySummary::from(&config)),
    }) {
        warn!(link_id = %id, error = %e, "failed to record analytics entry");
    }

    metrics::record_link_created();
    info!(
        link_id = %id,
        allowed_violations = config.allowed_violations,
        duration_minutes = ?config.session_duration_minutes,
        require_email = config.require_email,
        "link created"
    );

    Ok(CreatedLink {
        id,
        config,
        url,
        warnings,
    })
}

/// Deletes a stored link. Returns whether it existed.
///
/// # Errors
///
/// Returns `StoreError` if the store cannot be written.
pub fn delete_link<S>(store: &S, id: &str) -> Result<bool, StoreError>
where
    S: ConfigStore + AnalyticsLog + ?Sized,
{
    let Some(config) = store.load_config(id)? else {
        return Ok(false);
    };
    store.delete_config(id)?;
    if let Err(e) = store.record_analytics(AnalyticsEntry {
        id: id.to_string(),
        action: AnalyticsAction::WrapperDeleted,
        timestamp: Utc::now(),
        config: Some(PolicySummary::from(&config)),
    }) {
        warn!(link_id = %id, error = %e, "failed to record analytics entry");
    }
    info!(link_id = %id, "link deleted");
    Ok(true)
}
