//! ZTE C300/C600 series

use super::{Conversions, Metric};
use crate::device::RawValue;

/// 10G uplink capacity
pub(super) const MAX_BANDWIDTH_MBPS: f64 = 10_000.0;

pub(super) const IDENTIFIERS: &[(Metric, &str)] = &[
    (Metric::Temperature, "1.3.6.1.4.1.3902.1082.500.10.2.3.1.1.2"),
    (Metric::Voltage, "1.3.6.1.4.1.3902.1082.500.10.2.3.1.1.3"),
    (Metric::TxPower, "1.3.6.1.4.1.3902.1082.500.10.2.3.1.1.4"),
    (Metric::RxPower, "1.3.6.1.4.1.3902.1082.500.10.2.3.1.1.5"),
    (Metric::BytesIn, "1.3.6.1.2.1.2.2.1.10"),
    (Metric::BytesOut, "1.3.6.1.2.1.2.2.1.16"),
];

pub(super) const CONVERSIONS: Conversions = Conversions {
    temperature: parse_temperature,
    voltage: parse_voltage,
    power: parse_power,
};

/// 1/256 °C
fn parse_temperature(raw: &RawValue) -> Option<f64> {
    raw.as_f64().map(|v| v / 256.0)
}

/// 0.1 mV
fn parse_voltage(raw: &RawValue) -> Option<f64> {
    raw.as_f64().map(|v| v / 10_000.0)
}

/// 0.01 dBm, zero means no reading
fn parse_power(raw: &RawValue) -> Option<f64> {
    raw.as_f64().filter(|v| *v != 0.0).map(|v| v / 100.0)
}
