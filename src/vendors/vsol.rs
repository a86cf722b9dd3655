//! V-SOL V1600 series

use super::{Conversions, Metric};
use crate::device::RawValue;

/// GPON line rate
pub(super) const MAX_BANDWIDTH_MBPS: f64 = 2_500.0;

const POWER_MIN_DBM: f64 = -40.0;
const POWER_MAX_DBM: f64 = 10.0;

pub(super) const IDENTIFIERS: &[(Metric, &str)] = &[
    (Metric::Temperature, "1.3.6.1.4.1.37950.1.1.5.12.1.25.1.17"),
    (Metric::Voltage, "1.3.6.1.4.1.37950.1.1.5.12.1.25.1.18"),
    (Metric::TxPower, "1.3.6.1.4.1.37950.1.1.5.12.1.25.1.20"),
    (Metric::RxPower, "1.3.6.1.4.1.37950.1.1.5.12.1.25.1.21"),
    (Metric::BytesIn, "1.3.6.1.4.1.37950.1.1.5.12.2.1.1.2"),
    (Metric::BytesOut, "1.3.6.1.4.1.37950.1.1.5.12.2.1.1.3"),
];

pub(super) const CONVERSIONS: Conversions = Conversions {
    temperature: parse_temperature,
    voltage: parse_voltage,
    power: parse_power,
};

/// 0.001 °C
fn parse_temperature(raw: &RawValue) -> Option<f64> {
    raw.as_f64().map(|v| v / 1_000.0)
}

/// mV
fn parse_voltage(raw: &RawValue) -> Option<f64> {
    raw.as_f64().map(|v| v / 1_000.0)
}

/// 0.01 dBm. Zero and anything outside `[-40, 10]` is invalid.
fn parse_power(raw: &RawValue) -> Option<f64> {
    let dbm = raw.as_f64()? / 100.0;

    if dbm == 0.0 || !(POWER_MIN_DBM..=POWER_MAX_DBM).contains(&dbm) {
        return None;
    }

    Some((dbm * 100.0).round() / 100.0)
}
