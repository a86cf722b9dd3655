//! The record every sink receives for one polled port
//!
//! A single `PortSnapshot` is built per port and poll. The latest-state
//! store overwrites its columns by port id, the time-series sink appends it
//! as a point, and the cache stores its string form under
//! `port:<id>:metrics`. Absent metrics stay absent in every one of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{HealthScore, NormalizedMetricSet, PonPort};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSnapshot {
    pub port_id: i64,
    pub olt_id: i64,
    pub port_name: String,
    pub metrics: NormalizedMetricSet,
    pub health_score: HealthScore,
    /// Write time; devices expose no trustworthy clock
    pub polled_at: DateTime<Utc>,
}

impl PortSnapshot {
    pub fn new(
        port: &PonPort,
        metrics: NormalizedMetricSet,
        health_score: HealthScore,
        polled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            port_id: port.id,
            olt_id: port.olt_id,
            port_name: port.name.clone(),
            metrics,
            health_score,
            polled_at,
        }
    }

    /// Present numeric fields as `(name, value)` pairs, in a fixed order.
    ///
    /// Shared by the time-series and cache encodings so both carry the same
    /// field names. `health_score` is not included.
    pub fn present_fields(&self) -> Vec<(&'static str, FieldValue)> {
        let m = &self.metrics;
        let floats = [
            ("temperature", m.temperature),
            ("voltage", m.voltage),
            ("tx_power", m.tx_power),
            ("rx_power", m.rx_power),
            ("utilization", m.utilization),
        ];
        let counters = [
            ("bandwidth_in", m.bandwidth_in),
            ("bandwidth_out", m.bandwidth_out),
            ("online_onus", m.online_onus.map(u64::from)),
            ("offline_onus", m.offline_onus.map(u64::from)),
            ("total_onus", m.total_onus.map(u64::from)),
        ];

        floats
            .into_iter()
            .filter_map(|(name, v)| v.map(|v| (name, FieldValue::Float(v))))
            .chain(
                counters
                    .into_iter()
                    .filter_map(|(name, v)| v.map(|v| (name, FieldValue::Unsigned(v)))),
            )
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Unsigned(u64),
}
