//! Environment variable configuration source.

use super::ConfigSource;
use crate::error::{Result, SensorError};
use config::Environment;
use std::collections::HashMap;

/// Environment variable configuration source.
///
/// Loads every variable starting with `<PREFIX>_`, strips the prefix and
/// lowercases the remainder. Values are kept as strings.
///
/// # Examples
///
/// ```rust
/// use mock_sensor::sources::EnvSource;
///
/// // VIAM_API_KEY -> api_key, VIAM_API_KEY_ID -> api_key_id
/// let source = EnvSource::new("VIAM");
/// ```
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    /// Create a new environment variable source for `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl ConfigSource for EnvSource {
    fn load(&self) -> Result<HashMap<String, config::Value>> {
        // No nested-key separator: VIAM_API_KEY_ID must stay a single key
        let env_source = Environment::with_prefix(&self.prefix).prefix_separator("_");

        let config = config::Config::builder()
            .add_source(env_source)
            .build()
            .map_err(|e| {
                SensorError::Load(format!("Failed to load environment variables: {}", e))
            })?;

        config
            .try_deserialize::<HashMap<String, config::Value>>()
            .map_err(|e| SensorError::Load(format!("Failed to parse environment variables: {}", e)))
    }

    fn name(&self) -> String {
        format!("env:{}_*", self.prefix)
    }
}
