//! Link configuration
//!
//! Schema, validation and the two transports (stored id, encoded bundle)
//! through which a session receives its policy.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{BundleSource, ConfigSource, LinkTarget, StoreSource, load_configuration};
pub use schema::Configuration;
pub use validation::{ValidationResult, Validator};
