//! FiberHome AN5516 series

use super::{Conversions, Metric};
use crate::device::RawValue;

/// GPON line rate
pub(super) const MAX_BANDWIDTH_MBPS: f64 = 2_500.0;

/// Readings beyond this magnitude are sentinel values, not optics
const POWER_LIMIT_DBM: f64 = 50.0;

pub(super) const IDENTIFIERS: &[(Metric, &str)] = &[
    (Metric::Temperature, "1.3.6.1.4.1.5875.800.2.5.1.1.9"),
    (Metric::Voltage, "1.3.6.1.4.1.5875.800.2.5.1.1.10"),
    (Metric::TxPower, "1.3.6.1.4.1.5875.800.2.5.1.1.11"),
    (Metric::RxPower, "1.3.6.1.4.1.5875.800.2.5.1.1.12"),
    (Metric::BytesIn, "1.3.6.1.4.1.5875.800.2.5.1.1.15"),
    (Metric::BytesOut, "1.3.6.1.4.1.5875.800.2.5.1.1.16"),
];

pub(super) const CONVERSIONS: Conversions = Conversions {
    temperature: parse_temperature,
    voltage: parse_voltage,
    power: parse_power,
};

/// 0.01 °C
fn parse_temperature(raw: &RawValue) -> Option<f64> {
    raw.as_f64().map(|v| v / 100.0)
}

/// mV
fn parse_voltage(raw: &RawValue) -> Option<f64> {
    raw.as_f64().map(|v| v / 1_000.0)
}

/// 0.01 dBm
fn parse_power(raw: &RawValue) -> Option<f64> {
    raw.as_f64()
        .map(|v| v / 100.0)
        .filter(|dbm| dbm.abs() <= POWER_LIMIT_DBM)
}
