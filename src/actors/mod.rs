//! Actor-based polling
//!
//! A single `PollerActor` owns the schedule and runs one cycle at a time.
//! Within a cycle each OLT is polled in its own task.
//!
//! ## Architecture Overview
//!
//! ```text
//!          PollerHandle ── commands (mpsc) ──▶ PollerActor
//!                                                  │ per cycle
//!                         ┌────────────────────────┼────────────────────────┐
//!                         ▼                        ▼                        ▼
//!                   OLT task 1               OLT task 2     ...       OLT task N
//!                         │ ports, one at a time
//!                         ▼
//!          MetricReader → health / thresholds → MultiSinkWriter, AlertDispatcher
//!
//!          PollerActor ── CycleReport (broadcast) ──▶ subscribers
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: mpsc command channel for control messages
//! 2. **Events**: broadcast channel for cycle reports
//! 3. **Request/Response**: oneshot channels for `poll_now` and `shutdown`

pub mod messages;
pub mod poller;

pub use messages::{CycleReport, OltOutcome};
pub use poller::{Pipeline, PollError, PollerHandle, next_delay};
