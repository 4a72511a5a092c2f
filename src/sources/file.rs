//! File-based component configuration.

use crate::error::{Result, SensorError};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

/// Attribute file format, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
    Toml,
}

/// Component attributes stored in a YAML, TOML, or JSON file.
///
/// Keys are kept exactly as written; field names and match keys are
/// case-sensitive.
///
/// # Examples
///
/// ```rust,no_run
/// use mock_sensor::sources::FileSource;
///
/// let attributes = FileSource::new("config/thermometer.yaml").load()?;
/// # Ok::<(), mock_sensor::error::SensorError>(())
/// ```
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a new file source with automatic format detection.
    ///
    /// The format is detected from the file extension:
    /// - `.yaml`, `.yml` -> YAML
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn format(&self) -> Result<Format> {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                SensorError::Load(format!(
                    "Unable to determine file format for: {}",
                    self.path.display()
                ))
            })?;

        match extension {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            _ => Err(SensorError::Load(format!(
                "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
                extension
            ))),
        }
    }

    /// Read and parse the file into an attribute map.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Io`] if the file cannot be read and
    /// [`SensorError::Load`] if it cannot be parsed or its root is not a table.
    pub fn load(&self) -> Result<Map<String, Value>> {
        let format = self.format()?;
        let body = fs::read_to_string(&self.path)?;

        let parsed: Value = match format {
            Format::Json => serde_json::from_str(&body).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::from_str(&body).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(&body).map_err(|e| e.to_string()),
        }
        .map_err(|e| SensorError::Load(format!("Failed to parse {}: {}", self.name(), e)))?;

        match parsed {
            Value::Object(attributes) => Ok(attributes),
            other => Err(SensorError::Load(format!(
                "Expected a table at the root of {}, got {}",
                self.name(),
                other
            ))),
        }
    }

    /// Get a human-readable name for this source (for logging/debugging).
    pub fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
