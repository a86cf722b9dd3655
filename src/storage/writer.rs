//! Fan-out of one polled port to the three sinks
//!
//! Writes happen in a fixed order: latest-state, time-series, cache. The
//! cache is written only after the state write has returned, so a reader
//! that goes cache → state never finds a cache entry newer than the state.
//! Each write is attempted regardless of how the previous one went, and
//! none of them is rolled back.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, instrument};

use super::backend::{CacheSink, StateSink, TimeSeriesSink};
use super::error::StorageError;
use super::schema::PortSnapshot;
use crate::{HealthScore, NormalizedMetricSet, PonPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    State,
    TimeSeries,
    Cache,
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::State => write!(f, "state"),
            Sink::TimeSeries => write!(f, "time-series"),
            Sink::Cache => write!(f, "cache"),
        }
    }
}

#[derive(Debug)]
pub enum SinkOutcome {
    Written,
    /// Sink is not configured
    Skipped,
    Failed(StorageError),
}

impl SinkOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, SinkOutcome::Written)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SinkOutcome::Failed(_))
    }
}

/// Per-sink result of one write
#[derive(Debug)]
pub struct SinkReport {
    pub state: SinkOutcome,
    pub time_series: SinkOutcome,
    pub cache: SinkOutcome,
}

impl SinkReport {
    pub fn failures(&self) -> usize {
        [&self.state, &self.time_series, &self.cache]
            .into_iter()
            .filter(|outcome| outcome.is_failed())
            .count()
    }
}

#[derive(Debug, Default)]
struct SinkCounters {
    writes: AtomicU64,
    failures: AtomicU64,
    skipped: AtomicU64,
}

impl SinkCounters {
    fn record(&self, outcome: &SinkOutcome) {
        let counter = match outcome {
            SinkOutcome::Written => &self.writes,
            SinkOutcome::Skipped => &self.skipped,
            SinkOutcome::Failed(_) => &self.failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SinkCounts {
        SinkCounts {
            writes: self.writes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkCounts {
    pub writes: u64,
    pub failures: u64,
    pub skipped: u64,
}

/// Running totals since startup, one set per sink
#[derive(Debug, Default)]
pub struct SinkStats {
    state: SinkCounters,
    time_series: SinkCounters,
    cache: SinkCounters,
}

impl SinkStats {
    pub fn get(&self, sink: Sink) -> SinkCounts {
        match sink {
            Sink::State => self.state.snapshot(),
            Sink::TimeSeries => self.time_series.snapshot(),
            Sink::Cache => self.cache.snapshot(),
        }
    }
}

#[derive(Clone)]
pub struct MultiSinkWriter {
    state: Arc<dyn StateSink>,
    time_series: Option<Arc<dyn TimeSeriesSink>>,
    cache: Arc<dyn CacheSink>,
    stats: Arc<SinkStats>,
}

impl MultiSinkWriter {
    /// `time_series` may be `None`; its writes are then counted as skipped.
    pub fn new(
        state: Arc<dyn StateSink>,
        time_series: Option<Arc<dyn TimeSeriesSink>>,
        cache: Arc<dyn CacheSink>,
    ) -> Self {
        Self {
            state,
            time_series,
            cache,
            stats: Arc::new(SinkStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SinkStats> {
        self.stats.clone()
    }

    pub fn state(&self) -> &Arc<dyn StateSink> {
        &self.state
    }

    /// Write one poll result for `port`. All sinks share one timestamp.
    #[instrument(skip_all, fields(port = port.id))]
    pub async fn write(
        &self,
        port: &PonPort,
        metrics: NormalizedMetricSet,
        health_score: HealthScore,
    ) -> SinkReport {
        let snapshot = PortSnapshot::new(port, metrics, health_score, Utc::now());

        let state = outcome(Sink::State, self.state.upsert_port_state(&snapshot).await);
        self.stats.state.record(&state);

        let time_series = match &self.time_series {
            Some(sink) => outcome(Sink::TimeSeries, sink.append_point(&snapshot).await),
            None => SinkOutcome::Skipped,
        };
        self.stats.time_series.record(&time_series);

        let cache = outcome(Sink::Cache, self.cache.put_snapshot(&snapshot).await);
        self.stats.cache.record(&cache);

        debug!(
            "port {} written (health {}), {} sink failure(s)",
            port.name,
            health_score,
            [&state, &time_series, &cache]
                .iter()
                .filter(|o| o.is_failed())
                .count()
        );

        SinkReport {
            state,
            time_series,
            cache,
        }
    }
}

fn outcome(sink: Sink, result: Result<(), StorageError>) -> SinkOutcome {
    match result {
        Ok(()) => SinkOutcome::Written,
        Err(e) => {
            error!("{sink} write failed: {e}");
            SinkOutcome::Failed(e)
        }
    }
}
