//! Vendor profiles
//!
//! Each supported vendor contributes a table of device identifiers and a
//! table of conversion functions turning raw readings into normalized units.
//! Profiles are plain data: no state, no I/O.
//!
//! ## Conversion contracts
//!
//! | Vendor    | temperature  | voltage        | optical power                           |
//! |-----------|--------------|----------------|-----------------------------------------|
//! | ZTE       | raw / 256    | raw / 10000    | 0 or missing ⇒ invalid, else raw / 100  |
//! | FiberHome | raw / 100    | raw / 1000     | invalid if abs(raw / 100) > 50          |
//! | VSOL      | raw / 1000   | raw / 1000     | invalid if 0, < -40 or > 10; 2 decimals |
//!
//! Invalid power readings come back as `None`, never as `0.0`.

use std::collections::HashMap;
use std::fmt;

use crate::device::RawValue;

mod fiberhome;
mod vsol;
mod zte;

/// Metrics read from every port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    Voltage,
    TxPower,
    RxPower,
    /// Received octet counter
    BytesIn,
    /// Transmitted octet counter
    BytesOut,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Temperature,
        Metric::Voltage,
        Metric::TxPower,
        Metric::RxPower,
        Metric::BytesIn,
        Metric::BytesOut,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Voltage => "voltage",
            Metric::TxPower => "tx_power",
            Metric::RxPower => "rx_power",
            Metric::BytesIn => "bytes_in",
            Metric::BytesOut => "bytes_out",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    Zte,
    FiberHome,
    Vsol,
}

impl Vendor {
    pub const ALL: [Vendor; 3] = [Vendor::Zte, Vendor::FiberHome, Vendor::Vsol];

    /// Resolve an inventory vendor tag, ignoring case.
    pub fn from_tag(tag: &str) -> Option<Vendor> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "ZTE" => Some(Vendor::Zte),
            "FIBERHOME" => Some(Vendor::FiberHome),
            "VSOL" | "V-SOL" => Some(Vendor::Vsol),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Vendor::Zte => "ZTE",
            Vendor::FiberHome => "FIBERHOME",
            Vendor::Vsol => "VSOL",
        }
    }

    fn conversions(self) -> Conversions {
        match self {
            Vendor::Zte => zte::CONVERSIONS,
            Vendor::FiberHome => fiberhome::CONVERSIONS,
            Vendor::Vsol => vsol::CONVERSIONS,
        }
    }

    fn identifiers(self) -> &'static [(Metric, &'static str)] {
        match self {
            Vendor::Zte => zte::IDENTIFIERS,
            Vendor::FiberHome => fiberhome::IDENTIFIERS,
            Vendor::Vsol => vsol::IDENTIFIERS,
        }
    }

    fn max_bandwidth_mbps(self) -> f64 {
        match self {
            Vendor::Zte => zte::MAX_BANDWIDTH_MBPS,
            Vendor::FiberHome => fiberhome::MAX_BANDWIDTH_MBPS,
            Vendor::Vsol => vsol::MAX_BANDWIDTH_MBPS,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

type Conversion = fn(&RawValue) -> Option<f64>;

/// Per-vendor conversion functions
#[derive(Debug, Clone, Copy)]
struct Conversions {
    temperature: Conversion,
    voltage: Conversion,
    power: Conversion,
}

/// Identifier table and conversions for one vendor
#[derive(Debug, Clone)]
pub struct VendorProfile {
    vendor: Vendor,
    identifiers: &'static [(Metric, &'static str)],
    conversions: Conversions,
    max_bandwidth_mbps: f64,
}

impl VendorProfile {
    pub fn for_vendor(vendor: Vendor) -> Self {
        Self {
            vendor,
            identifiers: vendor.identifiers(),
            conversions: vendor.conversions(),
            max_bandwidth_mbps: vendor.max_bandwidth_mbps(),
        }
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    /// Port capacity used for utilization when nothing else is known
    pub fn max_bandwidth_mbps(&self) -> f64 {
        self.max_bandwidth_mbps
    }

    /// Base identifier for a metric; the port index is appended by the reader
    pub fn identifier_for(&self, metric: Metric) -> Option<&'static str> {
        self.identifiers
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, identifier)| *identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = (Metric, &'static str)> + '_ {
        self.identifiers.iter().copied()
    }

    /// Convert a raw reading into normalized units.
    ///
    /// Returns `None` when the reading is missing, not numeric, or invalid
    /// under the vendor's rules.
    pub fn parse(&self, metric: Metric, raw: &RawValue) -> Option<f64> {
        let value = match metric {
            Metric::Temperature => (self.conversions.temperature)(raw),
            Metric::Voltage => (self.conversions.voltage)(raw),
            Metric::TxPower | Metric::RxPower => (self.conversions.power)(raw),
            Metric::BytesIn | Metric::BytesOut => raw.as_u64().map(|v| v as f64),
        };

        value.filter(|v| v.is_finite())
    }

    pub fn utilization(
        &self,
        bytes_in: u64,
        bytes_out: u64,
        interval_secs: f64,
        max_bandwidth_mbps: f64,
    ) -> f64 {
        utilization(bytes_in, bytes_out, interval_secs, max_bandwidth_mbps)
    }
}

/// Port utilization in percent, clamped to `[0, 100]`.
///
/// `(bytes_in + bytes_out) * 8 / interval` gives bits per second, which is
/// compared against the port capacity in Mbps.
pub fn utilization(bytes_in: u64, bytes_out: u64, interval_secs: f64, max_bandwidth_mbps: f64) -> f64 {
    if interval_secs <= 0.0 || max_bandwidth_mbps <= 0.0 {
        return 0.0;
    }

    let total_bits = (bytes_in as f64 + bytes_out as f64) * 8.0;
    let mbps = total_bits / interval_secs / 1_000_000.0;

    (mbps / max_bandwidth_mbps * 100.0).clamp(0.0, 100.0)
}

/// Read-only vendor lookup, built once at startup
#[derive(Debug, Clone)]
pub struct VendorRegistry {
    profiles: HashMap<Vendor, VendorProfile>,
}

impl VendorRegistry {
    pub fn builtin() -> Self {
        Self {
            profiles: Vendor::ALL
                .into_iter()
                .map(|vendor| (vendor, VendorProfile::for_vendor(vendor)))
                .collect(),
        }
    }

    pub fn lookup(&self, tag: &str) -> Option<&VendorProfile> {
        Vendor::from_tag(tag).and_then(|vendor| self.profiles.get(&vendor))
    }

    pub fn supported_vendors(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.profiles.keys().map(|v| v.tag()).collect();
        tags.sort_unstable();
        tags
    }
}

impl Default for VendorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
