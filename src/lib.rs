//! # mock-sensor
//!
//! A sensor component that serves readings from declarative configuration
//! instead of hardware, so downstream systems can be tested against a
//! reproducible stream of values.
//!
//! ## Overview
//!
//! - `readings` holds static fallback values: a scalar, a flat list, or an
//!   object mapping field names to scalars or flat lists.
//! - `query` (optional) describes a remote tabular query. Its rows are fetched
//!   once per configuration and served round-robin in place of the static values.
//! - Every call advances one shared counter; each source is indexed with
//!   `counter % len`.
//!
//! ## Quick Start
//!
//! ```rust
//! use mock_sensor::prelude::*;
//! use serde_json::json;
//!
//! # async fn example() -> Result<()> {
//! let config = ComponentConfig::from_json("thermo", json!({
//!     "readings": {"temp": [10, 20, 30], "unit": "C"}
//! }))?;
//!
//! MockSensor::validate_config(&config)?;
//! let sensor = MockSensor::new(&config)?;
//!
//! let first = sensor.get_readings(None, None).await?;
//! assert_eq!(first["temp"], ReadingValue::Int(10));
//! assert_eq!(first["unit"], ReadingValue::from("C"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Remote data
//!
//! The query protocol itself is not part of this crate. Plug a client in
//! through [`sources::DataConnector`]; without one, a configured query always
//! degrades to the static values.

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod sensor;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{ComponentConfig, Reading, ReadingSpec, ReadingValue, Validate};
    pub use crate::error::{Result, SensorError, ValidationError};
    pub use crate::sensor::{CacheState, MockSensor, MockSensorBuilder, Sensor};
}
