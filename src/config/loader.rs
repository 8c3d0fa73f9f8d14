//! Configuration loading
//!
//! A session's configuration arrives by one of two equivalent routes:
//!
//! 1. A lookup by link id in a [`ConfigStore`]
//! 2. A self-contained bundle (base64 of the JSON configuration) carried
//!    in the link itself, with no store round-trip
//!
//! Both are [`ConfigSource`]s, and [`load_configuration`] runs the same
//! session-time validation on whichever one is used.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use tracing::{debug, warn};
use url::Url;

use crate::config::schema::Configuration;
use crate::config::validation::Validator;
use crate::error::ConfigError;
use crate::store::ConfigStore;

/// Query parameter carrying an encoded bundle.
pub const BUNDLE_PARAM: &str = "config";

/// Query parameter carrying a stored link id.
pub const ID_PARAM: &str = "id";

/// Page the share link points at.
pub const WRAPPER_PAGE: &str = "wrapper.html";

// ============================================================================
// Sources
// ============================================================================

/// Anything that can produce a session configuration.
pub trait ConfigSource {
    /// Produces the raw (not yet validated) configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration cannot be found or decoded.
    fn fetch(&self) -> Result<Configuration, ConfigError>;

    /// Short description for log output.
    fn describe(&self) -> String;
}

/// Configuration embedded in the link as an encoded bundle.
#[derive(Debug, Clone)]
pub struct BundleSource {
    encoded: String,
}

impl BundleSource {
    /// Wraps an encoded bundle string.
    #[must_use]
    pub fn new(encoded: impl Into<String>) -> Self {
        Self {
            encoded: encoded.into(),
        }
    }
}

impl ConfigSource for BundleSource {
    fn fetch(&self) -> Result<Configuration, ConfigError> {
        decode_bundle(&self.encoded)
    }

    fn describe(&self) -> String {
        format!("embedded bundle ({} bytes)", self.encoded.len())
    }
}

/// Configuration looked up by id in a store.
pub struct StoreSource<'a> {
    store: &'a dyn ConfigStore,
    id: String,
}

impl<'a> StoreSource<'a> {
    /// Creates a source reading link `id` from `store`.
    #[must_use]
    pub fn new(store: &'a dyn ConfigStore, id: impl Into<String>) -> Self {
        Self {
            store,
            id: id.into(),
        }
    }
}

impl ConfigSource for StoreSource<'_> {
    fn fetch(&self) -> Result<Configuration, ConfigError> {
        self.store
            .load_config(&self.id)?
            .ok_or_else(|| ConfigError::NotFound {
                id: self.id.clone(),
            })
    }

    fn describe(&self) -> String {
        format!("stored link '{}'", self.id)
    }
}

impl std::fmt::Debug for StoreSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSource")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Fetches and validates a configuration from any source.
///
/// Validation warnings are logged; only errors reject the configuration.
///
/// # Errors
///
/// Returns `ConfigError` if fetching fails or validation finds errors.
pub fn load_configuration(source: &dyn ConfigSource) -> Result<Configuration, ConfigError> {
    debug!(source = %source.describe(), "loading configuration");
    let config = source.fetch()?;
    let warnings = Validator::new().validate_session(&config).into_result()?;
    for issue in &warnings {
        warn!(%issue, "configuration warning");
    }
    Ok(config)
}

// ============================================================================
// Bundle codec
// ============================================================================

/// Encodes a configuration as a link bundle.
///
/// # Errors
///
/// Returns `ConfigError::Decode` if the configuration cannot be serialized.
pub fn encode_bundle(config: &Configuration) -> Result<String, ConfigError> {
    let json = serde_json::to_vec(config).map_err(|e| ConfigError::Decode(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

/// Decodes a link bundle into a configuration.
///
/// Accepts standard and URL-safe alphabets with or without padding. A
/// bundle pasted raw into a query string reads back with `+` turned into
/// spaces; those are restored.
///
/// # Errors
///
/// Returns `ConfigError::Decode` if the bundle is not base64 or not a
/// configuration document.
pub fn decode_bundle(encoded: &str) -> Result<Configuration, ConfigError> {
    let cleaned = encoded.trim().replace(' ', "+");
    if cleaned.is_empty() {
        return Err(ConfigError::Decode("bundle is empty".to_string()));
    }

    let bytes = [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(cleaned.as_bytes()).ok())
        .ok_or_else(|| ConfigError::Decode("bundle is not valid base64".to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| ConfigError::Decode(e.to_string()))
}

// ============================================================================
// Share links
// ============================================================================

/// Where a share link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Self-contained encoded bundle.
    Bundle(String),
    /// Stored link id.
    Id(String),
}

/// Resolves the wrapper page under `base_url`.
///
/// `base_url` is the directory hosting the wrapper page; a trailing slash
/// is added when missing.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if `base_url` is not an absolute URL.
pub fn wrapper_url(base_url: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: "baseUrl".to_string(),
        value: base_url.to_string(),
        expected: format!("an absolute URL ({reason})"),
    };
    let mut base = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(WRAPPER_PAGE).map_err(|e| invalid(e.to_string()))
}

/// Builds the share URL for a configuration.
///
/// # Errors
///
/// Returns `ConfigError::Decode` if the configuration cannot be encoded and
/// `ConfigError::InvalidValue` if `base_url` is not an absolute URL.
pub fn share_url(base_url: &str, config: &Configuration) -> Result<String, ConfigError> {
    let bundle = encode_bundle(config)?;
    let mut url = wrapper_url(base_url)?;
    url.query_pairs_mut().append_pair(BUNDLE_PARAM, &bundle);
    Ok(url.into())
}

/// Extracts the configuration reference from a share URL.
///
/// Query values are percent-decoded. An embedded bundle wins over an id
/// when both are present; empty values are ignored.
#[must_use]
pub fn parse_link(url: &str) -> Option<LinkTarget> {
    let url = Url::parse(url.trim()).ok()?;
    let mut id = None;
    for (key, value) in url.query_pairs() {
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            BUNDLE_PARAM => return Some(LinkTarget::Bundle(value.into_owned())),
            ID_PARAM => id = Some(LinkTarget::Id(value.into_owned())),
            _ => {}
        }
    }
    id
}
