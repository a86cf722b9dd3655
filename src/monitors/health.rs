//! Port health score
//!
//! Starts at 100 and subtracts one penalty per band. Every penalty is taken
//! from the same base and the result never drops below 0.
//!
//! | Input          | Band            | Penalty |
//! |----------------|-----------------|---------|
//! | utilization    | > 90 / > 80 / > 70 | 30 / 20 / 10 |
//! | temperature    | > 70 / > 60     | 20 / 10 |
//! | rx_power       | < -30 / < -28   | 30 / 15 |
//! | offline ratio  | > 0.3 / > 0.2   | 20 / 10 |
//!
//! Absent temperature or rx power contributes nothing. The offline ratio is
//! only considered when the total ONU count is known and non-zero.

use crate::{HealthScore, NormalizedMetricSet};

fn utilization_penalty(utilization: f64) -> i32 {
    if utilization > 90.0 {
        30
    } else if utilization > 80.0 {
        20
    } else if utilization > 70.0 {
        10
    } else {
        0
    }
}

fn temperature_penalty(temperature: f64) -> i32 {
    if temperature > 70.0 {
        20
    } else if temperature > 60.0 {
        10
    } else {
        0
    }
}

fn rx_power_penalty(rx_power: f64) -> i32 {
    if rx_power < -30.0 {
        30
    } else if rx_power < -28.0 {
        15
    } else {
        0
    }
}

fn offline_penalty(offline: u32, total: u32) -> i32 {
    if total == 0 {
        return 0;
    }

    let ratio = f64::from(offline) / f64::from(total);
    if ratio > 0.3 {
        20
    } else if ratio > 0.2 {
        10
    } else {
        0
    }
}

pub fn score(metrics: &NormalizedMetricSet) -> HealthScore {
    let mut score = 100;

    score -= utilization_penalty(metrics.utilization.unwrap_or(0.0));

    if let Some(temperature) = metrics.temperature {
        score -= temperature_penalty(temperature);
    }

    if let Some(rx_power) = metrics.rx_power {
        score -= rx_power_penalty(rx_power);
    }

    if let Some(total) = metrics.total_onus {
        score -= offline_penalty(metrics.offline_onus.unwrap_or(0), total);
    }

    HealthScore::new(score)
}
