//! Per-configuration provider state.

use crate::core::{
    ComponentConfig, Credentials, QueryPredicate, READINGS_ATTRIBUTE, Reading, ReadingSpec,
    parse_scalar,
};
use crate::error::{Result, SensorError};
use crate::sources::Row;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;

/// Observable state of the remote-row cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheState {
    /// No fetch has completed since the last reconfiguration
    Unset,
    /// A fetch completed with no usable rows, failed, or no query is configured
    Empty,
    /// Rows returned by the remote service, served round-robin
    Populated(Vec<Reading>),
}

/// Everything needed to run the remote query.
#[derive(Debug, Clone)]
pub(crate) struct RemoteQuery {
    pub(crate) predicate: QueryPredicate,
    pub(crate) pipeline: Vec<Value>,
    pub(crate) credentials: Credentials,
}

/// Immutable configuration-derived snapshot.
#[derive(Debug)]
pub(crate) struct Snapshot {
    pub(crate) name: String,
    pub(crate) spec: ReadingSpec,
    pub(crate) remote: Option<RemoteQuery>,
}

/// Snapshot plus the runtime record it owns. Replaced as a unit on reconfiguration.
#[derive(Debug)]
pub(crate) struct ProviderState {
    pub(crate) snapshot: Snapshot,
    /// Remote rows; an empty vector means the cache settled to `Empty`
    pub(crate) cache: OnceCell<Vec<Reading>>,
    pub(crate) counter: AtomicU64,
}

impl ProviderState {
    /// Build fresh state for `config`. Credentials are resolved only when a query is present.
    pub(crate) fn build(
        config: &ComponentConfig,
        env_credentials: impl FnOnce() -> Credentials,
    ) -> Result<Self> {
        let readings = config
            .readings()
            .ok_or(SensorError::MissingAttribute(READINGS_ATTRIBUTE))?;
        let spec = ReadingSpec::from_attribute(readings)?;

        let remote = QueryPredicate::translate(config.query(), &spec)?.map(|predicate| {
            let credentials = env_credentials().overridden_by(&predicate.overrides);
            RemoteQuery {
                pipeline: predicate.pipeline(),
                predicate,
                credentials,
            }
        });

        Ok(Self {
            snapshot: Snapshot {
                name: config.name().to_string(),
                spec,
                remote,
            },
            cache: OnceCell::new(),
            counter: AtomicU64::new(0),
        })
    }

    /// Take the next counter value, incrementing it by one.
    pub(crate) fn next_index(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel)
    }

    /// Pick the reading for call number `counter` from the settled cache.
    pub(crate) fn select(&self, rows: &[Reading], counter: u64) -> Reading {
        if rows.is_empty() {
            self.snapshot.spec.reading_at(counter)
        } else {
            rows[(counter % rows.len() as u64) as usize].clone()
        }
    }

    pub(crate) fn cache_state(&self) -> CacheState {
        match self.cache.get() {
            None => CacheState::Unset,
            Some(rows) if rows.is_empty() => CacheState::Empty,
            Some(rows) => CacheState::Populated(rows.clone()),
        }
    }
}

/// Reduce remote rows to scalar readings, dropping rows left with no fields.
pub(crate) fn rows_to_readings(rows: Vec<Row>) -> Vec<Reading> {
    rows.into_iter()
        .filter_map(|row| {
            let reading: Reading = row
                .into_iter()
                .filter_map(|(field, value)| match parse_scalar(&value) {
                    Some(scalar) => Some((field, scalar)),
                    None => {
                        tracing::trace!(field = %field, "dropping non-scalar column from remote row");
                        None
                    }
                })
                .collect();
            (!reading.is_empty()).then_some(reading)
        })
        .collect()
}
