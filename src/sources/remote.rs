//! Seam to the remote tabular data service.
//!
//! The query protocol, transport and authentication live behind
//! [`DataConnector`] and [`TabularDataClient`]; this crate only decides what
//! to ask for and when.

use crate::core::Credentials;
use crate::error::{Result, SensorError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

/// One row returned by the remote service.
pub type Row = Map<String, Value>;

/// A connected client of the tabular data service.
#[async_trait]
pub trait TabularDataClient: Send + Sync {
    /// Run an aggregation pipeline against the organization's tabular data.
    ///
    /// `timeout` is the caller's timeout, passed through untouched.
    ///
    /// # Errors
    ///
    /// Returns an error on transport or authentication failure.
    async fn tabular_data_by_mql(
        &self,
        organization_id: &str,
        pipeline: &[Value],
        timeout: Option<Duration>,
    ) -> Result<Vec<Row>>;

    /// Release the connection.
    async fn close(&self);
}

/// Creates [`TabularDataClient`]s from credentials.
#[async_trait]
pub trait DataConnector: Send + Sync {
    /// Dial the data service using api-key credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn TabularDataClient>>;

    /// Get a human-readable name for this connector (for logging/debugging).
    fn name(&self) -> String {
        "data-connector".to_string()
    }
}

/// Connector used when no data service is wired in.
///
/// Every connection attempt fails, so a configured query settles into the
/// static fallback values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedConnector;

#[async_trait]
impl DataConnector for DisconnectedConnector {
    async fn connect(&self, _credentials: &Credentials) -> Result<Box<dyn TabularDataClient>> {
        Err(SensorError::RemoteFetch(
            "no data connector configured".to_string(),
        ))
    }

    fn name(&self) -> String {
        "disconnected".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disconnected_connector_always_fails() {
        let connector = DisconnectedConnector;
        let result = connector.connect(&Credentials::default()).await;
        assert!(matches!(result, Err(SensorError::RemoteFetch(_))));
        assert_eq!(connector.name(), "disconnected");
    }
}
