//! Configuration validation support.

use crate::error::ValidationError;

/// Trait for configuration validation.
///
/// Validation runs before a configuration is applied, so malformed input is
/// rejected with a descriptive error instead of surfacing during a reading.
///
/// # Examples
///
/// ```rust
/// use mock_sensor::core::{ComponentConfig, Validate};
/// use serde_json::json;
///
/// let config = ComponentConfig::from_json("thermo", json!({
///     "readings": {"temp": {"nested": 1}}
/// })).unwrap();
///
/// assert!(config.validate().is_err());
/// ```
pub trait Validate {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Should return a `ValidationError` describing what validation failed.
    fn validate(&self) -> Result<(), ValidationError>;
}
