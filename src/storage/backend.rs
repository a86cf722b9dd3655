//! Inventory and sink traits
//!
//! The poller talks to four collaborators, each behind its own trait so a
//! failure in one never has to be reasoned about in terms of another:
//!
//! - [`Inventory`]: active OLTs and ports, plus the last-poll write-back
//! - [`StateSink`]: authoritative latest value per port
//! - [`TimeSeriesSink`]: append-only history
//! - [`CacheSink`]: short-lived snapshot for dashboards
//!
//! Implementations must be `Send + Sync`; one instance is shared by every
//! concurrently polled OLT.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StorageResult;
use super::schema::PortSnapshot;
use crate::{Olt, PonPort};

/// Health status of a backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

impl HealthStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
            metadata: HashMap::new(),
        }
    }
}

#[async_trait]
pub trait Inventory: Send + Sync {
    /// All OLTs with status `active`
    async fn fetch_active_olts(&self) -> StorageResult<Vec<Olt>>;

    /// All ports of `olt_id` with status `active`
    async fn fetch_active_ports(&self, olt_id: i64) -> StorageResult<Vec<PonPort>>;

    /// Record that `olt_id` was polled at `at`.
    ///
    /// `reachable` is false when the OLT has ports but none of them returned
    /// any data.
    async fn record_olt_poll(&self, olt_id: i64, at: DateTime<Utc>, reachable: bool)
    -> StorageResult<()>;
}

#[async_trait]
pub trait StateSink: Send + Sync {
    /// Overwrite the current metric columns, health score and last-poll
    /// timestamp of the snapshot's port.
    async fn upsert_port_state(&self, snapshot: &PortSnapshot) -> StorageResult<()>;

    /// Current value of a port, `None` if it was never polled
    async fn latest_state(&self, port_id: i64) -> StorageResult<Option<PortSnapshot>>;

    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Release pooled connections
    async fn close(&self) -> StorageResult<()>;
}

#[async_trait]
pub trait TimeSeriesSink: Send + Sync {
    /// Append one point. Points are never overwritten.
    async fn append_point(&self, snapshot: &PortSnapshot) -> StorageResult<()>;
}

#[async_trait]
pub trait CacheSink: Send + Sync {
    /// Replace the cached snapshot of a port and (re)arm its expiry.
    async fn put_snapshot(&self, snapshot: &PortSnapshot) -> StorageResult<()>;

    async fn health_check(&self) -> StorageResult<HealthStatus>;
}
