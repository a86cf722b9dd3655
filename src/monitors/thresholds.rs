//! Threshold checks against per-port limits
//!
//! Each check is independent, so one poll can yield zero to three alerts.
//! Nothing is deduplicated here: a condition that still holds on the next
//! poll raises the alert again.

use crate::{AlertEvent, AlertKind, NormalizedMetricSet, PonPort, PortRef};

pub fn evaluate(port: &PonPort, metrics: &NormalizedMetricSet) -> Vec<AlertEvent> {
    let limits = &port.thresholds;
    let mut alerts = Vec::new();

    if let Some(temperature) = metrics.temperature
        && temperature > limits.temperature_high
    {
        alerts.push(AlertEvent {
            port: PortRef::from(port),
            kind: AlertKind::Temperature,
            message: format!("Temperature high: {temperature:.1}°C"),
            value: temperature,
        });
    }

    if let Some(utilization) = metrics.utilization
        && utilization > limits.utilization_high
    {
        alerts.push(AlertEvent {
            port: PortRef::from(port),
            kind: AlertKind::Utilization,
            message: format!("Utilization high: {utilization:.1}%"),
            value: utilization,
        });
    }

    if let Some(rx_power) = metrics.rx_power
        && rx_power < limits.rx_power_low
    {
        alerts.push(AlertEvent {
            port: PortRef::from(port),
            kind: AlertKind::RxPower,
            message: format!("RX Power low: {rx_power:.1} dBm"),
            value: rx_power,
        });
    }

    alerts
}
