//! Helper functions for integration tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pon_poller::{
    AlertEvent, Olt, OltStatus, PonPort, PortStatus, PortThresholds,
    actors::Pipeline,
    alerts::AlertDispatcher,
    device::{DeviceClient, DeviceError, RawValue},
    monitors::reader::MetricReader,
    storage::{
        CacheSink, HealthStatus, Inventory, MultiSinkWriter, PortSnapshot, StorageError,
        StorageResult, TimeSeriesSink, memory::MemoryStore,
    },
    vendors::{Metric, Vendor, VendorProfile, VendorRegistry},
};

pub const READ_TIMEOUT: Duration = Duration::from_millis(200);
pub const INTERVAL: Duration = Duration::from_secs(60);

/// How a scripted device answers
#[derive(Clone)]
pub enum Device {
    /// Answers the identifiers in the map, times out on the rest
    Answer(HashMap<String, RawValue>),
    /// Same as `Answer`, after waiting on every read
    Slow(Duration, HashMap<String, RawValue>),
    /// Never answers
    Unreachable,
    /// The transport crashes
    Panic,
}

/// Device client answering from a per-address script
#[derive(Default)]
pub struct ScriptedClient {
    devices: Mutex<HashMap<String, Device>>,
    reads: Mutex<Vec<(String, String)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(self, address: &str, device: Device) -> Self {
        self.set_device(address, device);
        self
    }

    /// Change how `address` answers from now on
    pub fn set_device(&self, address: &str, device: Device) {
        self.devices
            .lock()
            .unwrap()
            .insert(address.to_string(), device);
    }

    /// Identifiers read from `address`, in order
    pub fn reads_of(&self, address: &str) -> Vec<String> {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, identifier)| identifier.clone())
            .collect()
    }
}

#[async_trait]
impl DeviceClient for ScriptedClient {
    async fn read(
        &self,
        address: &str,
        _credential: &str,
        identifier: &str,
        timeout: Duration,
    ) -> Result<RawValue, DeviceError> {
        self.reads
            .lock()
            .unwrap()
            .push((address.to_string(), identifier.to_string()));

        let device = self.devices.lock().unwrap().get(address).cloned();
        match device {
            Some(Device::Answer(values)) => {
                values.get(identifier).cloned().ok_or(DeviceError::Timeout(timeout))
            }
            Some(Device::Slow(delay, values)) => {
                tokio::time::sleep(delay).await;
                values.get(identifier).cloned().ok_or(DeviceError::Timeout(timeout))
            }
            Some(Device::Panic) => panic!("transport crashed for {address}"),
            Some(Device::Unreachable) | None => {
                Err(DeviceError::Unreachable(address.to_string()))
            }
        }
    }
}

/// Raw readings for one port of a vendor, keyed by full identifier
pub fn readings(vendor: Vendor, port_index: u32, values: &[(Metric, RawValue)]) -> HashMap<String, RawValue> {
    let profile = VendorProfile::for_vendor(vendor);
    values
        .iter()
        .map(|(metric, raw)| {
            let base = profile.identifier_for(*metric).unwrap();
            (format!("{base}.{port_index}"), raw.clone())
        })
        .collect()
}

/// Merge the readings of several ports served by the same device
pub fn merge(maps: Vec<HashMap<String, RawValue>>) -> HashMap<String, RawValue> {
    maps.into_iter().flatten().collect()
}

pub fn create_test_olt(id: i64, vendor: &str) -> Olt {
    Olt {
        id,
        name: format!("OLT-{id}"),
        vendor: vendor.to_string(),
        address: olt_address(id),
        credential: "public".to_string(),
        status: OltStatus::Active,
        last_poll: None,
    }
}

pub fn olt_address(id: i64) -> String {
    format!("10.10.0.{id}")
}

pub fn create_test_port(id: i64, olt_id: i64, index: u32) -> PonPort {
    PonPort {
        id,
        olt_id,
        name: format!("gpon-olt_1/{olt_id}/{index}"),
        index,
        status: PortStatus::Active,
        thresholds: PortThresholds::default(),
    }
}

/// Collects every dispatched alert
#[derive(Default)]
pub struct RecordingDispatcher {
    alerts: Mutex<Vec<AlertEvent>>,
}

impl RecordingDispatcher {
    pub fn alerts(&self) -> Vec<AlertEvent> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertDispatcher for RecordingDispatcher {
    async fn dispatch(&self, alert: &AlertEvent) {
        self.alerts.lock().unwrap().push(alert.clone());
    }
}

/// Cache that rejects every write
pub struct FailingCache;

#[async_trait]
impl CacheSink for FailingCache {
    async fn put_snapshot(&self, _snapshot: &PortSnapshot) -> StorageResult<()> {
        Err(StorageError::BackendError("cache down".to_string()))
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus::failed("cache down"))
    }
}

/// Time-series sink that keeps every point in memory
#[derive(Default)]
pub struct RecordingTimeSeries {
    points: Mutex<Vec<PortSnapshot>>,
}

impl RecordingTimeSeries {
    pub fn points(&self) -> Vec<PortSnapshot> {
        self.points.lock().unwrap().clone()
    }
}

#[async_trait]
impl TimeSeriesSink for RecordingTimeSeries {
    async fn append_point(&self, snapshot: &PortSnapshot) -> StorageResult<()> {
        self.points.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

/// Inventory whose queries always fail
pub struct BrokenInventory;

#[async_trait]
impl Inventory for BrokenInventory {
    async fn fetch_active_olts(&self) -> StorageResult<Vec<Olt>> {
        Err(StorageError::ConnectionFailed("inventory offline".to_string()))
    }

    async fn fetch_active_ports(&self, _olt_id: i64) -> StorageResult<Vec<PonPort>> {
        Err(StorageError::ConnectionFailed("inventory offline".to_string()))
    }

    async fn record_olt_poll(
        &self,
        _olt_id: i64,
        _at: DateTime<Utc>,
        _reachable: bool,
    ) -> StorageResult<()> {
        Err(StorageError::ConnectionFailed("inventory offline".to_string()))
    }
}

/// Sinks and collaborators a test pipeline writes to
pub struct TestSinks {
    pub store: Arc<MemoryStore>,
    pub time_series: Arc<RecordingTimeSeries>,
    pub cache: Arc<dyn CacheSink>,
    pub alerts: Arc<RecordingDispatcher>,
}

impl TestSinks {
    pub fn new(cache: Arc<dyn CacheSink>) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            time_series: Arc::new(RecordingTimeSeries::default()),
            cache,
            alerts: Arc::new(RecordingDispatcher::default()),
        }
    }

    pub fn pipeline(&self, client: Arc<ScriptedClient>) -> Pipeline {
        self.pipeline_with_inventory(client, self.store.clone())
    }

    pub fn pipeline_with_inventory(
        &self,
        client: Arc<ScriptedClient>,
        inventory: Arc<dyn Inventory>,
    ) -> Pipeline {
        let reader = MetricReader::new(client, READ_TIMEOUT);
        let writer = MultiSinkWriter::new(
            self.store.clone(),
            Some(self.time_series.clone()),
            self.cache.clone(),
        );

        Pipeline::new(
            inventory,
            Arc::new(VendorRegistry::builtin()),
            reader,
            writer,
            self.alerts.clone(),
        )
    }
}
