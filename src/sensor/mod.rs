//! The mock sensor component and the host-facing sensor interface.

mod mock;
mod state;

pub use mock::{CREDENTIALS_ENV_PREFIX, MockSensor, MockSensorBuilder};
pub use state::CacheState;

use crate::core::Reading;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Model triple under which the mock sensor registers with the host.
pub const MODEL: &str = "jad:mock-module:mock-module";

/// Geometry attached to a component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    /// Label of the geometry
    pub label: String,
}

/// Operations the host may invoke on a sensor component.
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Return the next reading.
    ///
    /// `timeout` is forwarded to any remote call and not enforced locally.
    async fn get_readings(
        &self,
        extra: Option<&Map<String, Value>>,
        timeout: Option<Duration>,
    ) -> Result<Reading>;

    /// Run a model-specific command.
    async fn do_command(
        &self,
        command: &Map<String, Value>,
        timeout: Option<Duration>,
    ) -> Result<Map<String, Value>>;

    /// Describe the component's geometries.
    async fn get_geometries(
        &self,
        extra: Option<&Map<String, Value>>,
        timeout: Option<Duration>,
    ) -> Result<Vec<Geometry>>;
}
