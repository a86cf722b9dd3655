//! One telemetry round-trip per metric for a single PON port.
//!
//! Octet identifiers are cumulative interface counters. Bandwidth and
//! utilization come from the difference between two consecutive samples of
//! the same port over the time that actually passed between them, so the
//! first sample of a port only sets the baseline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::NormalizedMetricSet;
use crate::device::{DeviceClient, DeviceError, RawValue};
use crate::vendors::{Metric, VendorProfile};

const COUNTER32_MODULUS: u64 = 1 << 32;

/// Last octet counters seen on a port
#[derive(Debug, Clone, Copy)]
struct CounterSample {
    bytes_in: u64,
    bytes_out: u64,
    at: Instant,
}

/// Reads every metric a vendor profile knows about for one port.
///
/// Each read is a single attempt bounded by `timeout`. A failed read leaves
/// the metric absent; it never aborts the remaining reads. Clones share the
/// counter baselines.
#[derive(Clone)]
pub struct MetricReader {
    client: Arc<dyn DeviceClient>,
    timeout: Duration,
    counters: Arc<Mutex<HashMap<(String, u32), CounterSample>>>,
}

impl MetricReader {
    pub fn new(client: Arc<dyn DeviceClient>, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            counters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Read and normalize all metrics of `port_index`.
    ///
    /// Returns `None` when no read produced a value, which is how an
    /// unreachable device or a port index the device does not know shows up.
    /// An empty answer (`noSuchInstance` and friends) counts as a failed
    /// read. Callers treat `None` as "no data" and skip the port for this
    /// cycle.
    pub async fn read(
        &self,
        address: &str,
        credential: &str,
        port_index: u32,
        profile: &VendorProfile,
    ) -> Option<NormalizedMetricSet> {
        let mut metrics = NormalizedMetricSet::default();
        let mut bytes_in = None;
        let mut bytes_out = None;
        let mut answered = 0usize;

        for (metric, base) in profile.identifiers() {
            let identifier = format!("{base}.{port_index}");

            let raw = match self.read_one(address, credential, &identifier).await {
                Ok(RawValue::Null) => {
                    debug!("{address}: {metric} ({identifier}) has no such instance");
                    continue;
                }
                Ok(raw) => {
                    answered += 1;
                    raw
                }
                Err(e) => {
                    debug!("{address}: {metric} ({identifier}) failed: {e}");
                    continue;
                }
            };

            let Some(value) = profile.parse(metric, &raw) else {
                trace!("{address}: {metric} ({identifier}) invalid reading {raw:?}");
                continue;
            };

            match metric {
                Metric::Temperature => metrics.temperature = Some(value),
                Metric::Voltage => metrics.voltage = Some(value),
                Metric::TxPower => metrics.tx_power = Some(value),
                Metric::RxPower => metrics.rx_power = Some(value),
                Metric::BytesIn => bytes_in = raw.as_u64(),
                Metric::BytesOut => bytes_out = raw.as_u64(),
            }
        }

        if answered == 0 {
            debug!("{address}: port {port_index} returned no data");
            return None;
        }

        if let (Some(bytes_in), Some(bytes_out)) = (bytes_in, bytes_out) {
            let sample = CounterSample {
                bytes_in,
                bytes_out,
                at: Instant::now(),
            };
            let previous = self
                .counters
                .lock()
                .await
                .insert((address.to_string(), port_index), sample);

            match previous {
                Some(previous) => apply_traffic(&mut metrics, previous, sample, profile),
                None => trace!("{address}: port {port_index} counter baseline set"),
            }
        }

        Some(metrics)
    }

    async fn read_one(
        &self,
        address: &str,
        credential: &str,
        identifier: &str,
    ) -> Result<RawValue, DeviceError> {
        // the transport receives the same bound, this one covers clients that ignore it
        match tokio::time::timeout(
            self.timeout,
            self.client.read(address, credential, identifier, self.timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeviceError::Timeout(self.timeout)),
        }
    }
}

/// Fill bandwidth and utilization from two samples of the same port.
/// Leaves them absent when no time passed or a counter was reset.
fn apply_traffic(
    metrics: &mut NormalizedMetricSet,
    previous: CounterSample,
    current: CounterSample,
    profile: &VendorProfile,
) {
    let elapsed_secs = current.at.duration_since(previous.at).as_secs_f64();
    if elapsed_secs <= 0.0 {
        return;
    }

    let (Some(delta_in), Some(delta_out)) = (
        counter_delta(previous.bytes_in, current.bytes_in),
        counter_delta(previous.bytes_out, current.bytes_out),
    ) else {
        debug!("octet counters went backwards, treating as reset");
        return;
    };

    metrics.bandwidth_in = Some(bits_per_second(delta_in, elapsed_secs));
    metrics.bandwidth_out = Some(bits_per_second(delta_out, elapsed_secs));
    metrics.utilization = Some(profile.utilization(
        delta_in,
        delta_out,
        elapsed_secs,
        profile.max_bandwidth_mbps(),
    ));
}

/// Octets counted between two readings of a cumulative counter.
///
/// A 32-bit counter that went backwards wrapped once. A wider counter that
/// went backwards was reset, which gives `None`.
fn counter_delta(previous: u64, current: u64) -> Option<u64> {
    if current >= previous {
        Some(current - previous)
    } else if previous < COUNTER32_MODULUS {
        Some(COUNTER32_MODULUS - previous + current)
    } else {
        None
    }
}

fn bits_per_second(octets: u64, interval_secs: f64) -> u64 {
    if interval_secs <= 0.0 {
        return 0;
    }
    (octets as f64 * 8.0 / interval_secs) as u64
}
