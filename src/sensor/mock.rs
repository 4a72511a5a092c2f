//! Configuration-driven mock sensor.

use super::state::{CacheState, ProviderState, RemoteQuery, rows_to_readings};
use super::{Geometry, Sensor};
use crate::core::{
    ComponentConfig, Credentials, READINGS_ATTRIBUTE, Reading, ReadingSpec, Validate,
};
use crate::error::{Result, SensorError};
use crate::sources::{ConfigSource, DataConnector, DisconnectedConnector, EnvSource, Row};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Prefix of the environment variables holding default credentials.
pub const CREDENTIALS_ENV_PREFIX: &str = "VIAM";

/// A sensor that serves readings from configuration instead of hardware.
///
/// Each call returns the next reading round-robin. When a `query` is
/// configured, the first call fetches a small page of rows from the remote
/// data service and later calls cycle through those rows; if the fetch fails
/// or yields nothing, the static `readings` values are served instead.
///
/// # Examples
///
/// ```rust
/// use mock_sensor::prelude::*;
/// use serde_json::json;
///
/// # async fn example() -> Result<()> {
/// let config = ComponentConfig::from_json("thermo", json!({
///     "readings": {"temp": [10, 20, 30]}
/// }))?;
/// let sensor = MockSensor::new(&config)?;
///
/// let reading = sensor.get_readings(None, None).await?;
/// assert_eq!(reading["temp"], ReadingValue::Int(10));
/// # Ok(())
/// # }
/// ```
pub struct MockSensor {
    state: ArcSwap<ProviderState>,
    connector: Arc<dyn DataConnector>,
    credential_source: Arc<dyn ConfigSource>,
}

impl MockSensor {
    /// Create a sensor with no remote data service and credentials from `VIAM_*`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: &ComponentConfig) -> Result<Self> {
        Self::builder().build(config)
    }

    /// Create a new builder for constructing a sensor.
    pub fn builder() -> MockSensorBuilder {
        MockSensorBuilder::new()
    }

    /// Validate a configuration before it is applied.
    ///
    /// Returns the required and optional dependencies, both always empty.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::MissingAttribute`] when `readings` is absent and
    /// [`SensorError::Validation`] for any malformed attribute.
    pub fn validate_config(config: &ComponentConfig) -> Result<(Vec<String>, Vec<String>)> {
        if config.readings().is_none() {
            return Err(SensorError::MissingAttribute(READINGS_ATTRIBUTE));
        }
        config.validate()?;
        Ok((Vec::new(), Vec::new()))
    }

    /// Apply a new configuration, resetting the cache and the call counter.
    ///
    /// On error the previous configuration stays in effect.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn reconfigure(&self, config: &ComponentConfig) -> Result<()> {
        let state = build_state(config, self.credential_source.as_ref())?;
        self.state.store(Arc::new(state));
        Ok(())
    }

    /// The component name from the active configuration.
    pub fn name(&self) -> String {
        self.state.load().snapshot.name.clone()
    }

    /// The active reading specification.
    pub fn reading_spec(&self) -> ReadingSpec {
        self.state.load().snapshot.spec.clone()
    }

    /// The current state of the remote-row cache.
    pub fn cache_state(&self) -> CacheState {
        self.state.load().cache_state()
    }

    /// Number of readings served since the last reconfiguration.
    pub fn reading_count(&self) -> u64 {
        self.state
            .load()
            .counter
            .load(std::sync::atomic::Ordering::Acquire)
    }
}

#[async_trait]
impl Sensor for MockSensor {
    async fn get_readings(
        &self,
        _extra: Option<&Map<String, Value>>,
        timeout: Option<Duration>,
    ) -> Result<Reading> {
        let state = self.state.load_full();

        let rows = match state.cache.get() {
            Some(rows) => rows.as_slice(),
            None => {
                // The fill runs in its own task so a caller dropped mid-fetch
                // cannot leave the cell empty for the next caller to refetch.
                // Concurrent fills queue on the cell and the first one wins.
                let fill_state = Arc::clone(&state);
                let connector = Arc::clone(&self.connector);
                let fill = tokio::spawn(async move {
                    fill_state
                        .cache
                        .get_or_init(|| populate(connector.as_ref(), &fill_state, timeout))
                        .await;
                });
                if let Err(e) = fill.await {
                    error!(error = %e, "remote cache fill task failed");
                }
                state.cache.get().map(Vec::as_slice).unwrap_or_default()
            }
        };

        let counter = state.next_index();
        Ok(state.select(rows, counter))
    }

    async fn do_command(
        &self,
        _command: &Map<String, Value>,
        _timeout: Option<Duration>,
    ) -> Result<Map<String, Value>> {
        error!("`do_command` is not implemented");
        Err(SensorError::Unsupported("do_command"))
    }

    async fn get_geometries(
        &self,
        _extra: Option<&Map<String, Value>>,
        _timeout: Option<Duration>,
    ) -> Result<Vec<Geometry>> {
        error!("`get_geometries` is not implemented");
        Err(SensorError::Unsupported("get_geometries"))
    }
}

/// Builder for constructing a [`MockSensor`].
///
/// # Examples
///
/// ```rust
/// use mock_sensor::prelude::*;
/// use mock_sensor::sources::{DisconnectedConnector, EnvSource};
/// use serde_json::json;
///
/// # fn example() -> Result<()> {
/// let config = ComponentConfig::from_json("thermo", json!({"readings": 42}))?;
/// let sensor = MockSensor::builder()
///     .with_connector(DisconnectedConnector)
///     .with_credential_source(EnvSource::new("VIAM"))
///     .build(&config)?;
/// # Ok(())
/// # }
/// ```
pub struct MockSensorBuilder {
    connector: Arc<dyn DataConnector>,
    credential_source: Arc<dyn ConfigSource>,
}

impl MockSensorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            connector: Arc::new(DisconnectedConnector),
            credential_source: Arc::new(EnvSource::new(CREDENTIALS_ENV_PREFIX)),
        }
    }

    /// Set the connector used to reach the remote data service.
    pub fn with_connector<C: DataConnector + 'static>(mut self, connector: C) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Set where default credentials come from.
    ///
    /// Defaults to the `VIAM_*` environment variables.
    pub fn with_credential_source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
        self.credential_source = Arc::new(source);
        self
    }

    /// Validate `config` and build the sensor.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn build(self, config: &ComponentConfig) -> Result<MockSensor> {
        let state = build_state(config, self.credential_source.as_ref())?;
        Ok(MockSensor {
            state: ArcSwap::from_pointee(state),
            connector: self.connector,
            credential_source: self.credential_source,
        })
    }
}

impl Default for MockSensorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the remote query once, degrading every failure to an empty result.
async fn populate(
    connector: &dyn DataConnector,
    state: &ProviderState,
    timeout: Option<Duration>,
) -> Vec<Reading> {
    let Some(remote) = &state.snapshot.remote else {
        debug!("no query configured, serving static readings");
        return Vec::new();
    };

    match fetch(connector, remote, timeout).await {
        Ok(rows) => {
            let readings = rows_to_readings(rows);
            debug!(rows = readings.len(), "cached remote readings");
            readings
        }
        Err(e) => {
            error!(
                sensor = %state.snapshot.name,
                error = %e,
                "in get_readings trying to query remote data"
            );
            Vec::new()
        }
    }
}

async fn fetch(
    connector: &dyn DataConnector,
    remote: &RemoteQuery,
    timeout: Option<Duration>,
) -> Result<Vec<Row>> {
    let client = match connector.connect(&remote.credentials).await {
        Ok(client) => client,
        Err(e) => {
            info!(
                connector = %connector.name(),
                "data client was never created, nothing to close"
            );
            return Err(e);
        }
    };

    let organization_id = remote.credentials.organization_id.as_deref().unwrap_or_default();
    debug!(
        organization_id,
        filtered = remote.predicate.match_filter.is_some(),
        stages = remote.pipeline.len(),
        "querying remote tabular data"
    );
    let result = client
        .tabular_data_by_mql(organization_id, &remote.pipeline, timeout)
        .await;
    client.close().await;
    result
}

fn build_state(
    config: &ComponentConfig,
    credential_source: &dyn ConfigSource,
) -> Result<ProviderState> {
    MockSensor::validate_config(config)?;

    let state = ProviderState::build(config, || env_credentials(credential_source))?;
    debug!(
        name = %state.snapshot.name,
        fields = state.snapshot.spec.len(),
        query = state.snapshot.remote.is_some(),
        "configured mock sensor"
    );
    Ok(state)
}

fn env_credentials(source: &dyn ConfigSource) -> Credentials {
    Credentials::from_source(source).unwrap_or_else(|e| {
        warn!(source = %source.name(), error = %e, "could not read default credentials");
        Credentials::default()
    })
}
