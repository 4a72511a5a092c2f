//! Canonical reading specification built from the `readings` attribute.

use crate::core::value::{ReadingValue, parse_scalar, parse_value};
use crate::error::{Result, SensorError, ValidationError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the configuration attribute holding the static fallback values.
pub const READINGS_ATTRIBUTE: &str = "readings";

/// Key used in returned readings when `readings` is a bare list or scalar.
pub const ANONYMOUS_FIELD: &str = "value";

/// One returned reading: field name to scalar value.
pub type Reading = BTreeMap<String, ReadingValue>;

/// Identifies one reading field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    /// The single unnamed field of a bare list or scalar `readings`
    Anonymous,
    /// A field declared by name in a keyed `readings` object
    Named(String),
}

impl FieldKey {
    /// The key this field is reported under in a [`Reading`].
    pub fn as_str(&self) -> &str {
        match self {
            Self::Anonymous => ANONYMOUS_FIELD,
            Self::Named(name) => name,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name to ordered, non-empty list of fallback values.
///
/// Built once per reconfiguration and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingSpec {
    fields: BTreeMap<FieldKey, Vec<ReadingValue>>,
}

impl ReadingSpec {
    /// Build the specification from the raw `readings` attribute.
    ///
    /// Shapes are tried in order: keyed object, bare list, bare scalar.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for nested structures, nulls, empty
    /// lists, or an object with no fields.
    pub fn from_attribute(readings: &Value) -> Result<Self> {
        let mut fields = BTreeMap::new();

        match readings {
            Value::Object(map) => {
                if map.is_empty() {
                    return Err(SensorError::Configuration(
                        "'readings' must declare at least one field".to_string(),
                    ));
                }
                for (name, value) in map {
                    // each field gets its own freshly parsed list
                    let values = parse_value(name, value)?.into_values();
                    fields.insert(FieldKey::Named(name.clone()), non_empty(name, values)?);
                }
            }
            Value::Array(_) | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                let values = parse_value(READINGS_ATTRIBUTE, readings)?.into_values();
                fields.insert(FieldKey::Anonymous, non_empty(READINGS_ATTRIBUTE, values)?);
            }
            Value::Null => {
                return Err(SensorError::unsupported_value(READINGS_ATTRIBUTE, readings));
            }
        }

        Ok(Self { fields })
    }

    /// Iterate over fields and their fallback values.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldKey, &[ReadingValue])> {
        self.fields.iter().map(|(key, values)| (key, values.as_slice()))
    }

    /// The fallback values of one field.
    pub fn values(&self, key: &FieldKey) -> Option<&[ReadingValue]> {
        self.fields.get(key).map(Vec::as_slice)
    }

    /// Names under which the fields are reported.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(FieldKey::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the spec has no fields. Never true for a successfully built spec.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build the static reading for call number `counter`.
    ///
    /// Every field is indexed by the same counter, modulo its own length.
    pub fn reading_at(&self, counter: u64) -> Reading {
        self.fields
            .iter()
            .map(|(key, values)| {
                let index = (counter % values.len() as u64) as usize;
                (key.as_str().to_string(), values[index].clone())
            })
            .collect()
    }
}

fn non_empty(context: &str, values: Vec<ReadingValue>) -> Result<Vec<ReadingValue>> {
    if values.is_empty() {
        return Err(SensorError::Configuration(format!(
            "'{}' must contain at least one value",
            context
        )));
    }
    Ok(values)
}

/// Check the shape of a `readings` attribute without building anything.
///
/// Collects every offending field instead of stopping at the first one.
pub fn validate_readings(readings: &Value) -> std::result::Result<(), ValidationError> {
    let mut errors = Vec::new();

    match readings {
        Value::Object(map) => {
            if map.is_empty() {
                errors.push(ValidationError::invalid_field(
                    READINGS_ATTRIBUTE,
                    "must declare at least one field",
                ));
            }
            for (name, value) in map {
                let path = format!("{}.{}", READINGS_ATTRIBUTE, name);
                if let Err(err) = check_field(&path, value) {
                    errors.push(err);
                }
            }
        }
        other => {
            if let Err(err) = check_field(READINGS_ATTRIBUTE, other) {
                errors.push(err);
            }
        }
    }

    match ValidationError::from_many(errors) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn check_field(path: &str, value: &Value) -> std::result::Result<(), ValidationError> {
    match value {
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(()),
        Value::Array(items) if items.is_empty() => Err(ValidationError::invalid_field(
            path,
            "list must contain at least one value",
        )),
        Value::Array(items) => match items.iter().position(|item| parse_scalar(item).is_none()) {
            Some(index) => Err(ValidationError::invalid_field(
                format!("{}[{}]", path, index),
                format!(
                    "found unsupported value {} within list. Only strings, numbers and bools are supported",
                    items[index]
                ),
            )),
            None => Ok(()),
        },
        Value::Null | Value::Object(_) => Err(ValidationError::invalid_field(
            path,
            format!(
                "found unsupported value {}. Only strings, numbers, bools and lists are supported",
                value
            ),
        )),
    }
}
