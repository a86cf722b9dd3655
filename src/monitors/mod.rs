//! Per-port evaluation stages
//!
//! ```text
//! MetricReader → NormalizedMetricSet ─┬─→ health::score      → HealthScore
//!                                     └─→ thresholds::evaluate → [AlertEvent]
//! ```

pub mod health;
pub mod reader;
pub mod thresholds;
