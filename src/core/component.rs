//! Component configuration as supplied by the host.

use crate::core::query::{QUERY_ATTRIBUTE, validate_query};
use crate::core::reading_spec::{READINGS_ATTRIBUTE, validate_readings};
use crate::core::validation::Validate;
use crate::error::{Result, SensorError, ValidationError};
use crate::sources::FileSource;
use serde_json::{Map, Value};
use std::path::Path;

/// A named component with a loosely-typed attribute tree.
///
/// # Examples
///
/// ```rust
/// use mock_sensor::core::ComponentConfig;
/// use serde_json::json;
///
/// let config = ComponentConfig::from_json("thermo", json!({
///     "readings": {"temp": [10, 20, 30]}
/// })).unwrap();
///
/// assert!(config.readings().is_some());
/// assert!(config.query().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentConfig {
    name: String,
    attributes: Map<String, Value>,
}

impl ComponentConfig {
    /// Create a configuration from an attribute map.
    pub fn new(name: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Create a configuration from a JSON value, which must be an object.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `attributes` is not an object.
    pub fn from_json(name: impl Into<String>, attributes: Value) -> Result<Self> {
        match attributes {
            Value::Object(map) => Ok(Self::new(name, map)),
            other => Err(SensorError::Configuration(format!(
                "attributes must be an object, got {}",
                other
            ))),
        }
    }

    /// Load attributes from a YAML, TOML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let attributes = FileSource::new(path.as_ref()).load()?;
        Ok(Self::new(name, attributes))
    }

    /// The component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All attributes.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// The raw `readings` attribute.
    pub fn readings(&self) -> Option<&Value> {
        self.attributes.get(READINGS_ATTRIBUTE)
    }

    /// The raw `query` attribute.
    pub fn query(&self) -> Option<&Value> {
        self.attributes.get(QUERY_ATTRIBUTE)
    }
}

impl Validate for ComponentConfig {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        let Some(readings) = self.readings() else {
            return Err(ValidationError::custom(
                SensorError::MissingAttribute(READINGS_ATTRIBUTE).to_string(),
            ));
        };

        let mut errors = Vec::new();
        if let Err(err) = validate_readings(readings) {
            errors.push(err);
        }
        if let Some(query) = self.query() {
            if let Err(err) = validate_query(query) {
                errors.push(err);
            }
        }

        match ValidationError::from_many(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
