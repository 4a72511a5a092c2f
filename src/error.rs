//! Error types for mock-sensor.

use std::fmt;

/// Result type alias for mock-sensor operations.
pub type Result<T> = std::result::Result<T, SensorError>;

/// Errors that can occur while configuring or operating the mock sensor.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// A required configuration attribute is absent.
    #[error("Missing required attribute '{0}' in config for mock-sensor")]
    MissingAttribute(&'static str),

    /// A configuration value has a shape the sensor does not accept.
    #[error("Unsupported value in {context}: {value}. Only strings, numbers, bools and flat lists of them are supported")]
    UnsupportedValue {
        /// Where the value was found (attribute or field name)
        context: String,
        /// The rejected value, rendered as JSON
        value: String,
    },

    /// The configuration is malformed in some other way.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    Validation(String),

    /// Failed to parse configuration from a source.
    #[error("Failed to load configuration: {0}")]
    Load(String),

    /// Connecting to or querying the remote data service failed.
    #[error("Remote data fetch failed: {0}")]
    RemoteFetch(String),

    /// The operation is not supported by this sensor.
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),

    /// Reading a configuration file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SensorError {
    /// Build an [`SensorError::UnsupportedValue`] from the offending JSON value.
    pub fn unsupported_value(context: impl Into<String>, value: &serde_json::Value) -> Self {
        Self::UnsupportedValue {
            context: context.into(),
            value: value.to_string(),
        }
    }

    /// Whether this error belongs to the configuration family.
    ///
    /// Configuration errors abort validation and reconfiguration; every other
    /// kind is either recovered internally or fails a single call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingAttribute(_)
                | Self::UnsupportedValue { .. }
                | Self::Configuration(_)
                | Self::Validation(_)
                | Self::Load(_)
        )
    }
}

/// Validation error for component configuration.
#[derive(Debug)]
pub enum ValidationError {
    /// Custom validation error with a message.
    Custom(String),

    /// A specific attribute or field has an invalid value.
    InvalidField {
        /// The field name/path
        field: String,
        /// The reason why it's invalid
        reason: String,
    },

    /// Multiple validation errors occurred.
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Create a custom validation error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Collapse a list of errors: `None` when empty, the sole error when there
    /// is one, [`ValidationError::Multiple`] otherwise.
    pub fn from_many(mut errors: Vec<ValidationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(msg) => write!(f, "{}", msg),
            Self::InvalidField { field, reason } => {
                write!(f, "Field '{}' is invalid: {}", field, reason)
            }
            Self::Multiple(errors) => {
                writeln!(f, "Multiple validation errors:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for SensorError {
    fn from(err: ValidationError) -> Self {
        SensorError::Validation(err.to_string())
    }
}
