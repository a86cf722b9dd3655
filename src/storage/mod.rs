//! Inventory and sinks
//!
//! Each collaborator sits behind a trait in [`backend`] so the poller never
//! depends on a concrete store:
//!
//! - **SQLite** (default): inventory plus latest-state, one database file
//! - **In-Memory**: inventory plus latest-state without persistence, for
//!   tests and dry runs
//! - **InfluxDB**: append-only time-series over the HTTP write API
//! - **Redis**: expiring per-port snapshot; an in-process cache with the same
//!   rules stands in when no Redis URL is configured
//!
//! [`MultiSinkWriter`] ties the three sinks together for one polled port.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use pon_poller::storage::{MultiSinkWriter, cache::MemoryCache, sqlite::SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(SqliteStore::new("./pon_poller.db", 10).await?);
//!     let writer = MultiSinkWriter::new(store, None, Arc::new(MemoryCache::new()));
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod error;
pub mod influx;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;
pub mod writer;

pub use backend::{CacheSink, HealthStatus, Inventory, StateSink, TimeSeriesSink};
pub use error::{StorageError, StorageResult};
pub use schema::PortSnapshot;
pub use writer::{MultiSinkWriter, Sink, SinkOutcome, SinkReport, SinkStats};
