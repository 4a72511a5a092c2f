//! Translation of the optional `query` attribute into remote query parameters.

use crate::core::reading_spec::ReadingSpec;
use crate::error::{Result, SensorError, ValidationError};
use crate::sources::ConfigSource;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};

/// Name of the optional configuration attribute describing the remote query.
pub const QUERY_ATTRIBUTE: &str = "query";

/// Sub-field of `query` holding the match filter.
pub const MATCH_FIELD: &str = "match";

/// Sub-field of `query` overriding the api key.
pub const API_KEY_FIELD: &str = "api_key";

/// Sub-field of `query` overriding the api key id.
pub const API_KEY_ID_FIELD: &str = "api_key_id";

/// Sub-field of `query` overriding the organization id.
pub const ORGANIZATION_ID_FIELD: &str = "organization_id";

/// Rows are ordered ascending by this column.
pub const SORT_FIELD: &str = "time_requested";

/// Number of leading rows skipped by the remote query.
pub const SKIP_ROWS: u64 = 1;

/// Maximum number of rows fetched by the remote query.
pub const PAGE_SIZE: u64 = 5;

/// Credentials and addressing for the remote data service.
///
/// Each field is optional; [`Credentials::overridden_by`] layers an explicit
/// configuration over the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// API key payload
    pub api_key: Option<String>,
    /// Entity the API key belongs to
    pub api_key_id: Option<String>,
    /// Organization whose data is queried
    pub organization_id: Option<String>,
}

impl Credentials {
    /// Read credentials from a configuration source.
    ///
    /// Keys are `api_key`, `api_key_id` and `organization_id`; with
    /// [`EnvSource::new("VIAM")`](crate::sources::EnvSource::new) these come from
    /// `VIAM_API_KEY`, `VIAM_API_KEY_ID` and `VIAM_ORGANIZATION_ID`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be loaded.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        let mut values = source.load()?;
        Ok(Self {
            api_key: take_string(&mut values, API_KEY_FIELD),
            api_key_id: take_string(&mut values, API_KEY_ID_FIELD),
            organization_id: take_string(&mut values, ORGANIZATION_ID_FIELD),
        })
    }

    /// Layer `overrides` on top of `self`; any value present in `overrides` wins.
    pub fn overridden_by(self, overrides: &Credentials) -> Self {
        Self {
            api_key: overrides.api_key.clone().or(self.api_key),
            api_key_id: overrides.api_key_id.clone().or(self.api_key_id),
            organization_id: overrides.organization_id.clone().or(self.organization_id),
        }
    }
}

fn take_string(values: &mut HashMap<String, config::Value>, key: &str) -> Option<String> {
    values.remove(key).and_then(|value| value.into_string().ok())
}

/// Remote query parameters derived from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPredicate {
    /// Match filter; `None` fetches without filtering, an empty map matches everything
    pub match_filter: Option<Map<String, Value>>,
    /// Reading field name to source path
    pub projection: BTreeMap<String, String>,
    /// Credential overrides taken from the `query` attribute
    pub overrides: Credentials,
}

impl QueryPredicate {
    /// Translate the `query` attribute, if present.
    ///
    /// The projection comes from the field names in `spec`, never from the
    /// query itself. Unknown sub-fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `query` is not an object, `match` is
    /// not an object, or a credential override is not a string.
    pub fn translate(query: Option<&Value>, spec: &ReadingSpec) -> Result<Option<Self>> {
        let Some(query) = query else {
            return Ok(None);
        };
        let fields = query.as_object().ok_or_else(|| {
            SensorError::Configuration(format!("'{}' must be an object", QUERY_ATTRIBUTE))
        })?;

        let mut match_filter = None;
        let mut overrides = Credentials::default();
        for (name, value) in fields {
            match name.as_str() {
                MATCH_FIELD => {
                    let filter = value.as_object().ok_or_else(|| {
                        SensorError::Configuration(format!(
                            "'{}.{}' must be an object",
                            QUERY_ATTRIBUTE, MATCH_FIELD
                        ))
                    })?;
                    match_filter = Some(filter.clone());
                }
                API_KEY_FIELD => overrides.api_key = Some(string_field(name, value)?),
                API_KEY_ID_FIELD => overrides.api_key_id = Some(string_field(name, value)?),
                ORGANIZATION_ID_FIELD => {
                    overrides.organization_id = Some(string_field(name, value)?)
                }
                other => tracing::debug!(field = other, "ignoring unknown query field"),
            }
        }

        Ok(Some(Self {
            match_filter,
            projection: projection_for(spec),
            overrides,
        }))
    }

    /// The ordered aggregation pipeline sent to the remote service.
    pub fn pipeline(&self) -> Vec<Value> {
        let mut stages = Vec::with_capacity(5);
        if let Some(filter) = &self.match_filter {
            stages.push(json!({ "$match": filter }));
        }
        stages.push(json!({ "$project": self.projection }));
        stages.push(json!({ "$sort": { SORT_FIELD: 1 } }));
        stages.push(json!({ "$skip": SKIP_ROWS }));
        stages.push(json!({ "$limit": PAGE_SIZE }));
        stages
    }
}

fn string_field(name: &str, value: &Value) -> Result<String> {
    value.as_str().map(str::to_string).ok_or_else(|| {
        SensorError::Configuration(format!("'{}.{}' must be a string", QUERY_ATTRIBUTE, name))
    })
}

/// Project every reading field from `data.readings.<field>`.
pub fn projection_for(spec: &ReadingSpec) -> BTreeMap<String, String> {
    spec.field_names()
        .map(|name| (name.to_string(), format!("$data.readings.{}", name)))
        .collect()
}

/// Check the shape of a `query` attribute without building anything.
pub fn validate_query(query: &Value) -> std::result::Result<(), ValidationError> {
    let Some(fields) = query.as_object() else {
        return Err(ValidationError::invalid_field(QUERY_ATTRIBUTE, "must be an object"));
    };

    let mut errors = Vec::new();
    for (name, value) in fields {
        let path = format!("{}.{}", QUERY_ATTRIBUTE, name);
        match name.as_str() {
            MATCH_FIELD if !value.is_object() => {
                errors.push(ValidationError::invalid_field(path, "must be an object"));
            }
            API_KEY_FIELD | API_KEY_ID_FIELD | ORGANIZATION_ID_FIELD if !value.is_string() => {
                errors.push(ValidationError::invalid_field(path, "must be a string"));
            }
            _ => {}
        }
    }

    match ValidationError::from_many(errors) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
