//! Session identity
//!
//! Session ids are a millisecond timestamp plus a short random suffix.
//! Sessions are never compared across pages, so no coordination is needed
//! beyond making collisions improbable.

use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;

/// Prefix of every session id.
pub const SESSION_ID_PREFIX: &str = "session_";

/// Prefix of every resume key.
pub const RESUME_KEY_PREFIX: &str = "secureFormSession_";

/// Length of the random suffix.
const SUFFIX_LEN: usize = 6;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates a new session id: `session_<unix millis>_<6 base36 chars>`.
#[must_use]
pub fn generate_session_id() -> String {
    format!(
        "{SESSION_ID_PREFIX}{}_{}",
        Utc::now().timestamp_millis(),
        random_base36(SUFFIX_LEN)
    )
}

/// Derives the page-local storage key for a session id.
///
/// Injective: distinct session ids always yield distinct keys.
#[must_use]
pub fn resume_key(session_id: &str) -> String {
    format!("{RESUME_KEY_PREFIX}{session_id}")
}

/// Returns `len` random lowercase base36 characters.
#[must_use]
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
        .collect()
}

/// Encodes a non-negative integer in lowercase base36.
#[must_use]
pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        // value % 36 < 36, so the index is always in range
        #[allow(clippy::cast_possible_truncation)]
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Page-local state kept for one started session.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResumeMarker {
    session_id: String,
    warning_acknowledged: bool,
}

/// Page-local markers for sessions that have already started.
///
/// Lets a reloaded page continue its own session without re-running
/// initialization. Lookups go through [`resume_key`], so a marker written
/// for one session id is invisible to every other id.
///
/// Warning acknowledgement is not logged, so the marker carries it.
#[derive(Debug, Default)]
pub struct ResumeMarkers {
    markers: DashMap<String, ResumeMarker>,
}

impl ResumeMarkers {
    /// Creates an empty marker store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `session_id` has started.
    ///
    /// Returns `true` if a marker was already present (a resumed session).
    pub fn mark_started(&self, session_id: &str) -> bool {
        let marker = ResumeMarker {
            session_id: session_id.to_string(),
            warning_acknowledged: false,
        };
        self.markers
            .insert(resume_key(session_id), marker)
            .is_some()
    }

    /// Returns whether `session_id` can continue from existing page state.
    #[must_use]
    pub fn can_resume(&self, session_id: &str) -> bool {
        self.markers
            .get(&resume_key(session_id))
            .is_some_and(|stored| stored.session_id == session_id)
    }

    /// Records that the warning of `session_id` was acknowledged.
    ///
    /// Does nothing if the session has no marker.
    pub fn mark_acknowledged(&self, session_id: &str) {
        if let Some(mut stored) = self.markers.get_mut(&resume_key(session_id)) {
            if stored.session_id == session_id {
                stored.warning_acknowledged = true;
            }
        }
    }

    /// Returns whether the warning of `session_id` was acknowledged.
    #[must_use]
    pub fn warning_acknowledged(&self, session_id: &str) -> bool {
        self.markers
            .get(&resume_key(session_id))
            .is_some_and(|stored| stored.session_id == session_id && stored.warning_acknowledged)
    }

    /// Removes the marker for `session_id`.
    pub fn clear(&self, session_id: &str) {
        self.markers.remove(&resume_key(session_id));
    }

    /// Number of live markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether no markers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
