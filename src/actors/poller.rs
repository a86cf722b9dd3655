//! PollerActor - Drives polling cycles over every active OLT
//!
//! ## Cycle
//!
//! ```text
//! FETCH_OLTS ─┬─ OLT 1: FETCH_PORTS → POLL_PORTS (sequential) → RECORD_LAST_POLL ─┐
//!             ├─ OLT 2: ...                                                       ├─ AGGREGATE → SLEEP
//!             └─ OLT N: ...                                                       ┘
//! ```
//!
//! Every OLT runs in its own task, so an error or a panic inside one OLT's
//! poll is counted as a failure for that OLT only. The cycle waits for all
//! of them before it reports.
//!
//! The next cycle starts `max(1s, interval - elapsed)` after the previous
//! one finished, which keeps the cadence anchored at cycle start without
//! ever looping hot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::alerts::AlertDispatcher;
use crate::monitors::{health, reader::MetricReader, thresholds};
use crate::storage::{Inventory, MultiSinkWriter, StorageError};
use crate::vendors::{VendorProfile, VendorRegistry};
use crate::{Olt, PonPort};

use super::messages::{CycleReport, OltOutcome, PollerCommand};

pub const MIN_CYCLE_DELAY: Duration = Duration::from_secs(1);

/// Why one OLT's poll did not complete
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("unsupported vendor {0:?}")]
    UnsupportedVendor(String),

    #[error("inventory error: {0}")]
    Inventory(#[from] StorageError),

    #[error("poll task failed: {0}")]
    TaskFailed(String),
}

/// Delay before the next cycle, given how long the last one took
pub fn next_delay(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed).max(MIN_CYCLE_DELAY)
}

enum PortOutcome {
    Polled { alerts: usize },
    NoData,
}

/// Everything one cycle needs, shared by all OLT tasks
#[derive(Clone)]
pub struct Pipeline {
    inventory: Arc<dyn Inventory>,
    registry: Arc<VendorRegistry>,
    reader: MetricReader,
    writer: MultiSinkWriter,
    alerts: Arc<dyn AlertDispatcher>,
}

impl Pipeline {
    pub fn new(
        inventory: Arc<dyn Inventory>,
        registry: Arc<VendorRegistry>,
        reader: MetricReader,
        writer: MultiSinkWriter,
        alerts: Arc<dyn AlertDispatcher>,
    ) -> Self {
        Self {
            inventory,
            registry,
            reader,
            writer,
            alerts,
        }
    }

    pub fn writer(&self) -> &MultiSinkWriter {
        &self.writer
    }

    /// Run one full cycle. Never fails; problems are counted in the report.
    pub async fn run_cycle(&self, interval: Duration) -> CycleReport {
        let started_at = Utc::now();
        let started = Instant::now();

        let mut report = CycleReport {
            started_at,
            olts_ok: 0,
            olts_failed: 0,
            ports_polled: 0,
            ports_no_data: 0,
            alerts_emitted: 0,
            elapsed: Duration::ZERO,
            next_delay: interval,
        };

        match self.inventory.fetch_active_olts().await {
            Ok(olts) => {
                debug!("polling {} active OLTs", olts.len());

                let ids: Vec<i64> = olts.iter().map(|olt| olt.id).collect();
                let tasks = olts.into_iter().map(|olt| {
                    let pipeline = self.clone();
                    tokio::spawn(async move { pipeline.poll_olt(&olt).await })
                });

                for (olt_id, joined) in ids.into_iter().zip(join_all(tasks).await) {
                    let result = joined
                        .map_err(|e| PollError::TaskFailed(e.to_string()))
                        .and_then(|r| r);

                    match result {
                        Ok(outcome) => {
                            report.olts_ok += 1;
                            report.ports_polled += outcome.ports_polled;
                            report.ports_no_data += outcome.ports_no_data;
                            report.alerts_emitted += outcome.alerts_emitted;
                        }
                        Err(e) => {
                            report.olts_failed += 1;
                            error!("OLT {olt_id} poll failed: {e}");
                        }
                    }
                }
            }
            Err(e) => error!("failed to fetch active OLTs: {e}"),
        }

        report.elapsed = started.elapsed();
        report.next_delay = next_delay(interval, report.elapsed);

        info!(
            "cycle done in {:.2}s: {} OLTs ok, {} failed, {} ports polled, {} without data, {} alerts",
            report.elapsed.as_secs_f64(),
            report.olts_ok,
            report.olts_failed,
            report.ports_polled,
            report.ports_no_data,
            report.alerts_emitted
        );

        report
    }

    /// Poll all active ports of one OLT, one after the other.
    #[instrument(skip_all, fields(olt = olt.id, name = %olt.name))]
    pub async fn poll_olt(&self, olt: &Olt) -> Result<OltOutcome, PollError> {
        let profile = self
            .registry
            .lookup(&olt.vendor)
            .ok_or_else(|| PollError::UnsupportedVendor(olt.vendor.clone()))?;

        let ports = self.inventory.fetch_active_ports(olt.id).await?;
        trace!("{} active ports", ports.len());

        let mut outcome = OltOutcome::default();
        for port in &ports {
            match self.poll_port(olt, port, profile).await {
                PortOutcome::Polled { alerts } => {
                    outcome.ports_polled += 1;
                    outcome.alerts_emitted += alerts;
                }
                PortOutcome::NoData => outcome.ports_no_data += 1,
            }
        }

        let reachable = outcome.reachable();
        if !reachable {
            warn!("no port of {} returned data", olt.address);
        }

        self.inventory
            .record_olt_poll(olt.id, Utc::now(), reachable)
            .await?;

        Ok(outcome)
    }

    #[instrument(skip_all, fields(port = port.id))]
    async fn poll_port(&self, olt: &Olt, port: &PonPort, profile: &VendorProfile) -> PortOutcome {
        let Some(metrics) = self
            .reader
            .read(&olt.address, &olt.credential, port.index, profile)
            .await
        else {
            return PortOutcome::NoData;
        };

        let score = health::score(&metrics);
        let alerts = thresholds::evaluate(port, &metrics);

        self.writer.write(port, metrics, score).await;

        for alert in &alerts {
            self.alerts.dispatch(alert).await;
        }

        PortOutcome::Polled {
            alerts: alerts.len(),
        }
    }

    async fn close(&self) {
        if let Err(e) = self.writer.state().close().await {
            error!("failed to close state store: {e}");
        }
    }
}

/// Actor owning the polling schedule
pub struct PollerActor {
    pipeline: Pipeline,

    interval: Duration,

    /// When false, cycles only run on `PollNow`
    scheduled: bool,

    command_rx: mpsc::Receiver<PollerCommand>,

    report_tx: broadcast::Sender<CycleReport>,
}

impl PollerActor {
    pub fn new(
        pipeline: Pipeline,
        interval: Duration,
        scheduled: bool,
        command_rx: mpsc::Receiver<PollerCommand>,
        report_tx: broadcast::Sender<CycleReport>,
    ) -> Self {
        Self {
            pipeline,
            interval,
            scheduled,
            command_rx,
            report_tx,
        }
    }

    /// Run the actor's main loop until `Shutdown` or until every handle is
    /// dropped. A cycle that is already running always completes first.
    #[instrument(skip(self), fields(interval = ?self.interval))]
    pub async fn run(mut self) {
        debug!("starting poller actor");

        let sleep = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep, if self.scheduled => {
                    let report = self.cycle().await;
                    sleep.as_mut().reset(tokio::time::Instant::now() + report.next_delay);
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(PollerCommand::PollNow { respond_to }) => {
                            debug!("received PollNow command");
                            let report = self.cycle().await;
                            let _ = respond_to.send(report);
                        }

                        Some(PollerCommand::Shutdown { respond_to }) => {
                            debug!("received shutdown command");
                            self.pipeline.close().await;
                            let _ = respond_to.send(());
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            self.pipeline.close().await;
                            break;
                        }
                    }
                }
            }
        }

        debug!("poller actor stopped");
    }

    async fn cycle(&self) -> CycleReport {
        let report = self.pipeline.run_cycle(self.interval).await;

        match self.report_tx.send(report.clone()) {
            Ok(receivers) => trace!("published cycle report to {receivers} receivers"),
            Err(_) => trace!("no receivers for cycle report"),
        }

        report
    }
}

/// Handle for controlling a PollerActor
#[derive(Clone)]
pub struct PollerHandle {
    sender: mpsc::Sender<PollerCommand>,
    report_tx: broadcast::Sender<CycleReport>,
}

impl PollerHandle {
    /// Spawn an actor that polls every `interval`, starting immediately.
    pub fn spawn(pipeline: Pipeline, interval: Duration) -> Self {
        Self::spawn_with(pipeline, interval, true)
    }

    /// Spawn an actor that only polls on [`PollerHandle::poll_now`].
    pub fn spawn_manual(pipeline: Pipeline, interval: Duration) -> Self {
        Self::spawn_with(pipeline, interval, false)
    }

    fn spawn_with(pipeline: Pipeline, interval: Duration, scheduled: bool) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (report_tx, _) = broadcast::channel(16);

        let actor = PollerActor::new(pipeline, interval, scheduled, cmd_rx, report_tx.clone());
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            report_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CycleReport> {
        self.report_tx.subscribe()
    }

    /// Run a cycle now and wait for its report
    pub async fn poll_now(&self) -> Result<CycleReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        rx.await.context("failed to receive cycle report")
    }

    /// Let the running cycle finish, close the stores, and stop the actor
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::Shutdown { respond_to: tx })
            .await
            .context("failed to send Shutdown command")?;

        rx.await.context("poller stopped before acknowledging shutdown")
    }
}
