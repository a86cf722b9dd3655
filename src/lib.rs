pub mod actors;
pub mod alerts;
pub mod config;
pub mod device;
pub mod monitors;
pub mod storage;
pub mod util;
pub mod vendors;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OltStatus {
    Active,
    Inactive,
}

/// An optical line terminal as recorded by the inventory.
///
/// `vendor` is kept as the raw inventory tag; it is resolved against the
/// vendor registry once per poll so an unknown tag stays a per-OLT failure
/// instead of a load error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Olt {
    pub id: i64,
    pub name: String,
    pub vendor: String,
    pub address: String,
    pub credential: String,
    pub status: OltStatus,
    pub last_poll: Option<DateTime<Utc>>,
}

impl OltStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OltStatus::Active => "active",
            OltStatus::Inactive => "inactive",
        }
    }

    /// Anything other than `active` counts as inactive.
    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("active") {
            OltStatus::Active
        } else {
            OltStatus::Inactive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Active,
    Inactive,
}

impl PortStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PortStatus::Active => "active",
            PortStatus::Inactive => "inactive",
        }
    }

    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("active") {
            PortStatus::Active
        } else {
            PortStatus::Inactive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortThresholds {
    pub temperature_high: f64,
    pub utilization_high: f64,
    pub rx_power_low: f64,
}

impl Default for PortThresholds {
    fn default() -> Self {
        Self {
            temperature_high: 70.0,
            utilization_high: 80.0,
            rx_power_low: -28.0,
        }
    }
}

/// A PON port owned by exactly one OLT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PonPort {
    pub id: i64,
    pub olt_id: i64,
    pub name: String,
    /// Vendor-addressable index appended to every identifier.
    pub index: u32,
    pub status: PortStatus,
    pub thresholds: PortThresholds,
}

/// Vendor-agnostic telemetry for one port at one point in time.
///
/// Every field is optional: `None` means the value was not obtained this
/// cycle (or the device reported a physically invalid reading). A present
/// value is always in normalized units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetricSet {
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Volts
    pub voltage: Option<f64>,
    /// dBm
    pub tx_power: Option<f64>,
    /// dBm
    pub rx_power: Option<f64>,
    /// Percentage 0-100
    pub utilization: Option<f64>,
    /// Bits per second
    pub bandwidth_in: Option<u64>,
    /// Bits per second
    pub bandwidth_out: Option<u64>,
    pub online_onus: Option<u32>,
    pub offline_onus: Option<u32>,
    pub total_onus: Option<u32>,
}

impl NormalizedMetricSet {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Derived 0-100 port health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HealthScore(u8);

impl HealthScore {
    pub const MAX: HealthScore = HealthScore(100);

    pub fn new(value: i32) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for HealthScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Temperature,
    Utilization,
    RxPower,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Temperature => write!(f, "temperature"),
            AlertKind::Utilization => write!(f, "utilization"),
            AlertKind::RxPower => write!(f, "rx_power"),
        }
    }
}

/// Reference to the port an alert was raised for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortRef {
    pub port_id: i64,
    pub olt_id: i64,
    pub port_name: String,
}

impl From<&PonPort> for PortRef {
    fn from(port: &PonPort) -> Self {
        Self {
            port_id: port.id,
            olt_id: port.olt_id,
            port_name: port.name.clone(),
        }
    }
}

/// A threshold violation produced by one poll of one port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub port: PortRef,
    pub kind: AlertKind,
    pub message: String,
    pub value: f64,
}
