//! Message types for the poller actor
//!
//! 1. **Commands**: sent to the actor via mpsc, answered through oneshot
//! 2. **Events**: `CycleReport`s broadcast to any subscriber after each cycle

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

/// Commands that can be sent to a PollerActor
#[derive(Debug)]
pub enum PollerCommand {
    /// Run one cycle right away and report on it
    PollNow {
        respond_to: oneshot::Sender<CycleReport>,
    },

    /// Stop after the current cycle and close the stores
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Aggregate of one polling cycle
///
/// Broadcast after every cycle. Slow subscribers may lag and miss reports,
/// which only affects observability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,

    /// OLTs whose poll ran to completion
    pub olts_ok: usize,

    /// OLTs with an unsupported vendor, an inventory error, or a crashed task
    pub olts_failed: usize,

    /// Ports that returned data and were written
    pub ports_polled: usize,

    /// Ports skipped because the device returned nothing
    pub ports_no_data: usize,

    pub alerts_emitted: usize,

    pub elapsed: Duration,

    /// Delay until the next scheduled cycle
    pub next_delay: Duration,
}

/// Result of polling one OLT
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OltOutcome {
    pub ports_polled: usize,
    pub ports_no_data: usize,
    pub alerts_emitted: usize,
}

impl OltOutcome {
    /// An OLT is reachable when it has no ports or at least one answered.
    pub fn reachable(&self) -> bool {
        self.ports_polled > 0 || self.ports_no_data == 0
    }
}
