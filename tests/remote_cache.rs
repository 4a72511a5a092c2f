//! Integration tests for the lazily populated remote-row cache.

use async_trait::async_trait;
use mock_sensor::core::Credentials;
use mock_sensor::prelude::*;
use mock_sensor::sources::{ConfigSource, DataConnector, Row, TabularDataClient};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Call {
    organization_id: String,
    pipeline: Vec<Value>,
    timeout: Option<Duration>,
}

/// Shared record of everything the connector and its clients saw.
#[derive(Default)]
struct Recorder {
    connects: AtomicUsize,
    closes: AtomicUsize,
    credentials: Mutex<Vec<Credentials>>,
    calls: Mutex<Vec<Call>>,
}

type Response = std::result::Result<Vec<Value>, String>;

struct ScriptedConnector {
    recorder: Arc<Recorder>,
    responses: Arc<Mutex<VecDeque<Response>>>,
    refuse_connection: bool,
    connect_delay: Option<Duration>,
}

impl ScriptedConnector {
    fn new(recorder: &Arc<Recorder>, responses: Vec<Response>) -> Self {
        Self {
            recorder: Arc::clone(recorder),
            responses: Arc::new(Mutex::new(responses.into())),
            refuse_connection: false,
            connect_delay: None,
        }
    }

    fn refusing(recorder: &Arc<Recorder>) -> Self {
        Self {
            refuse_connection: true,
            ..Self::new(recorder, Vec::new())
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }
}

#[async_trait]
impl DataConnector for ScriptedConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn TabularDataClient>> {
        self.recorder.connects.fetch_add(1, Ordering::SeqCst);
        self.recorder
            .credentials
            .lock()
            .unwrap()
            .push(credentials.clone());

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if self.refuse_connection {
            return Err(SensorError::RemoteFetch("connection refused".to_string()));
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        Ok(Box::new(ScriptedClient {
            recorder: Arc::clone(&self.recorder),
            response: Mutex::new(Some(response)),
        }))
    }
}

struct ScriptedClient {
    recorder: Arc<Recorder>,
    response: Mutex<Option<Response>>,
}

#[async_trait]
impl TabularDataClient for ScriptedClient {
    async fn tabular_data_by_mql(
        &self,
        organization_id: &str,
        pipeline: &[Value],
        timeout: Option<Duration>,
    ) -> Result<Vec<Row>> {
        self.recorder.calls.lock().unwrap().push(Call {
            organization_id: organization_id.to_string(),
            pipeline: pipeline.to_vec(),
            timeout,
        });

        match self.response.lock().unwrap().take() {
            Some(Ok(rows)) => Ok(rows
                .into_iter()
                .filter_map(|row| row.as_object().cloned())
                .collect()),
            Some(Err(message)) => Err(SensorError::RemoteFetch(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn close(&self) {
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct StaticCredentials(HashMap<String, config::Value>);

impl StaticCredentials {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), config::Value::from(*v)))
                .collect(),
        )
    }
}

impl ConfigSource for StaticCredentials {
    fn load(&self) -> Result<HashMap<String, config::Value>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> String {
        "static-credentials".to_string()
    }
}

fn config(attributes: Value) -> ComponentConfig {
    ComponentConfig::from_json("mock", attributes).unwrap()
}

fn queried_config() -> ComponentConfig {
    config(json!({
        "readings": {"temp": [1, 2, 3]},
        "query": {"match": {"component_name": "thermo"}},
    }))
}

fn sensor_with(connector: ScriptedConnector, config: &ComponentConfig) -> MockSensor {
    MockSensor::builder()
        .with_connector(connector)
        .with_credential_source(StaticCredentials::new(&[]))
        .build(config)
        .unwrap()
}

async fn collect(sensor: &MockSensor, count: usize) -> Vec<Reading> {
    let mut readings = Vec::with_capacity(count);
    for _ in 0..count {
        readings.push(sensor.get_readings(None, None).await.unwrap());
    }
    readings
}

#[tokio::test]
async fn test_rows_served_round_robin() {
    let recorder = Arc::new(Recorder::default());
    let connector = ScriptedConnector::new(
        &recorder,
        vec![Ok(vec![json!({"temp": 21.5}), json!({"temp": 22})])],
    );
    let sensor = sensor_with(connector, &queried_config());

    let temps: Vec<_> = collect(&sensor, 5)
        .await
        .into_iter()
        .map(|r| r["temp"].clone())
        .collect();

    assert_eq!(
        temps,
        vec![
            ReadingValue::Float(21.5),
            ReadingValue::Int(22),
            ReadingValue::Float(21.5),
            ReadingValue::Int(22),
            ReadingValue::Float(21.5),
        ]
    );
    assert!(matches!(sensor.cache_state(), CacheState::Populated(rows) if rows.len() == 2));
}

#[tokio::test]
async fn test_cache_populates_once_per_configuration() {
    let recorder = Arc::new(Recorder::default());
    let connector = ScriptedConnector::new(
        &recorder,
        vec![
            Ok(vec![json!({"temp": 100})]),
            Ok(vec![json!({"temp": 200})]),
        ],
    );
    let sensor = sensor_with(connector, &queried_config());

    for reading in collect(&sensor, 6).await {
        assert_eq!(reading["temp"], ReadingValue::Int(100));
    }
    assert_eq!(recorder.connects.load(Ordering::SeqCst), 1);

    sensor.reconfigure(&queried_config()).unwrap();
    assert_eq!(sensor.cache_state(), CacheState::Unset);

    let reading = sensor.get_readings(None, None).await.unwrap();
    assert_eq!(reading["temp"], ReadingValue::Int(200));
    assert_eq!(recorder.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_result_falls_back_to_static() {
    let recorder = Arc::new(Recorder::default());
    let sensor = sensor_with(
        ScriptedConnector::new(&recorder, vec![Ok(Vec::new())]),
        &queried_config(),
    );
    let baseline = MockSensor::new(&config(json!({"readings": {"temp": [1, 2, 3]}}))).unwrap();

    assert_eq!(collect(&sensor, 7).await, collect(&baseline, 7).await);
    assert_eq!(sensor.cache_state(), CacheState::Empty);
    assert_eq!(recorder.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_query_failure_falls_back_and_closes_client() {
    let recorder = Arc::new(Recorder::default());
    let sensor = sensor_with(
        ScriptedConnector::new(&recorder, vec![Err("unauthenticated".to_string())]),
        &queried_config(),
    );
    let baseline = MockSensor::new(&config(json!({"readings": {"temp": [1, 2, 3]}}))).unwrap();

    assert_eq!(collect(&sensor, 4).await, collect(&baseline, 4).await);
    assert_eq!(sensor.cache_state(), CacheState::Empty);
    assert_eq!(recorder.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_connection_failure_is_not_retried() {
    let recorder = Arc::new(Recorder::default());
    let sensor = sensor_with(ScriptedConnector::refusing(&recorder), &queried_config());

    let readings = collect(&sensor, 5).await;
    assert_eq!(readings[0]["temp"], ReadingValue::Int(1));
    assert_eq!(readings[3]["temp"], ReadingValue::Int(1));
    assert_eq!(recorder.connects.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_default_sensor_without_connector_degrades() {
    let sensor = MockSensor::builder()
        .with_credential_source(StaticCredentials::new(&[]))
        .build(&queried_config())
        .unwrap();

    let reading = sensor.get_readings(None, None).await.unwrap();
    assert_eq!(reading["temp"], ReadingValue::Int(1));
    assert_eq!(sensor.cache_state(), CacheState::Empty);
}

#[tokio::test]
async fn test_no_query_never_connects() {
    let recorder = Arc::new(Recorder::default());
    let sensor = sensor_with(
        ScriptedConnector::new(&recorder, vec![Ok(vec![json!({"temp": 9})])]),
        &config(json!({"readings": {"temp": [1, 2]}})),
    );

    let readings = collect(&sensor, 3).await;
    assert_eq!(readings[2]["temp"], ReadingValue::Int(1));
    assert_eq!(recorder.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_query_parameters_reach_client() {
    let recorder = Arc::new(Recorder::default());
    let connector = ScriptedConnector::new(&recorder, vec![Ok(vec![json!({"temp": 1})])]);
    let sensor = MockSensor::builder()
        .with_connector(connector)
        .with_credential_source(StaticCredentials::new(&[
            ("api_key", "env-key"),
            ("api_key_id", "env-key-id"),
            ("organization_id", "env-org"),
        ]))
        .build(&config(json!({
            "readings": {"temp": [1], "humidity": 50},
            "query": {
                "match": {"component_name": "thermo"},
                "api_key": "config-key",
                "organization_id": "config-org",
            },
        })))
        .unwrap();

    sensor
        .get_readings(None, Some(Duration::from_secs(3)))
        .await
        .unwrap();

    let credentials = recorder.credentials.lock().unwrap()[0].clone();
    assert_eq!(credentials.api_key.as_deref(), Some("config-key"));
    assert_eq!(credentials.api_key_id.as_deref(), Some("env-key-id"));

    let call = recorder.calls.lock().unwrap()[0].clone();
    assert_eq!(call.organization_id, "config-org");
    assert_eq!(call.timeout, Some(Duration::from_secs(3)));
    assert_eq!(
        call.pipeline,
        vec![
            json!({"$match": {"component_name": "thermo"}}),
            json!({"$project": {
                "humidity": "$data.readings.humidity",
                "temp": "$data.readings.temp",
            }}),
            json!({"$sort": {"time_requested": 1}}),
            json!({"$skip": 1}),
            json!({"$limit": 5}),
        ]
    );
}

#[tokio::test]
async fn test_query_without_match_fetches_unfiltered() {
    let recorder = Arc::new(Recorder::default());
    let sensor = sensor_with(
        ScriptedConnector::new(&recorder, vec![Ok(vec![json!({"temp": 7})])]),
        &config(json!({"readings": {"temp": 0}, "query": {}})),
    );

    assert_eq!(
        sensor.get_readings(None, None).await.unwrap()["temp"],
        ReadingValue::Int(7)
    );
    let call = recorder.calls.lock().unwrap()[0].clone();
    assert_eq!(call.pipeline.len(), 4);
    assert!(call.pipeline[0].get("$project").is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_readings_fetch_once() {
    let recorder = Arc::new(Recorder::default());
    let connector = ScriptedConnector::new(
        &recorder,
        vec![
            Ok(vec![json!({"temp": 1}), json!({"temp": 2})]),
            Ok(vec![json!({"temp": 99})]),
        ],
    )
    .with_delay(Duration::from_millis(50));
    let sensor = Arc::new(sensor_with(connector, &queried_config()));

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let sensor = Arc::clone(&sensor);
        tasks.spawn(async move { sensor.get_readings(None, None).await.unwrap() });
    }

    let mut ones = 0;
    let mut twos = 0;
    while let Some(reading) = tasks.join_next().await {
        match reading.unwrap()["temp"] {
            ReadingValue::Int(1) => ones += 1,
            ReadingValue::Int(2) => twos += 1,
            ref other => panic!("unexpected reading {other}"),
        }
    }

    assert_eq!(recorder.connects.load(Ordering::SeqCst), 1);
    assert_eq!((ones, twos), (4, 4));
    assert_eq!(sensor.reading_count(), 8);
}

#[tokio::test]
async fn test_cancelled_first_reading_does_not_refetch() {
    let recorder = Arc::new(Recorder::default());
    let connector = ScriptedConnector::new(
        &recorder,
        vec![
            Ok(vec![json!({"temp": 50})]),
            Ok(vec![json!({"temp": 99})]),
        ],
    )
    .with_delay(Duration::from_millis(200));
    let sensor = sensor_with(connector, &queried_config());

    let first =
        tokio::time::timeout(Duration::from_millis(50), sensor.get_readings(None, None)).await;
    assert!(first.is_err());
    assert_eq!(sensor.reading_count(), 0);

    let reading = sensor.get_readings(None, None).await.unwrap();
    assert_eq!(reading["temp"], ReadingValue::Int(50));
    assert_eq!(recorder.connects.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_file_config_keeps_field_and_match_case() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("sensor.json");
    std::fs::write(
        &path,
        r#"{
            "readings": {"Temp": [1, 2], "humidityPct": 3},
            "query": {"match": {"data.readings.Temp": {"$gt": 0}}}
        }"#,
    )
    .unwrap();

    let recorder = Arc::new(Recorder::default());
    let sensor = sensor_with(
        ScriptedConnector::refusing(&recorder),
        &ComponentConfig::from_file("thermo", &path).unwrap(),
    );

    let reading = sensor.get_readings(None, None).await.unwrap();
    assert_eq!(
        reading.keys().collect::<Vec<_>>(),
        vec!["Temp", "humidityPct"]
    );
    assert_eq!(reading["Temp"], ReadingValue::Int(1));
    assert_eq!(reading["humidityPct"], ReadingValue::Int(3));
}

#[tokio::test]
async fn test_file_config_match_and_projection_reach_client_verbatim() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("sensor.yaml");
    std::fs::write(
        &path,
        r#"
readings:
  Temp: [1, 2]
query:
  match:
    component_name: Thermo
    data.readings.Temp:
      $gt: 0
"#,
    )
    .unwrap();

    let recorder = Arc::new(Recorder::default());
    let sensor = sensor_with(
        ScriptedConnector::new(&recorder, vec![Ok(vec![json!({"Temp": 7})])]),
        &ComponentConfig::from_file("thermo", &path).unwrap(),
    );

    let reading = sensor.get_readings(None, None).await.unwrap();
    assert_eq!(reading["Temp"], ReadingValue::Int(7));

    let call = recorder.calls.lock().unwrap()[0].clone();
    assert_eq!(
        call.pipeline[0],
        json!({"$match": {"component_name": "Thermo", "data.readings.Temp": {"$gt": 0}}})
    );
    assert_eq!(
        call.pipeline[1],
        json!({"$project": {"Temp": "$data.readings.Temp"}})
    );
}
