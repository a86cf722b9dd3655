//! In-memory inventory and latest-state store (no persistence)
//!
//! Useful for tests and for running the pipeline without a database file.
//! All data is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, Inventory, StateSink};
use super::error::{StorageError, StorageResult};
use super::schema::PortSnapshot;
use crate::{Olt, OltStatus, PonPort, PortStatus};

#[derive(Default)]
struct Tables {
    olts: HashMap<i64, OltEntry>,
    ports: HashMap<i64, PonPort>,
    states: HashMap<i64, PortSnapshot>,
}

struct OltEntry {
    olt: Olt,
    reachable: Option<bool>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_olt(&self, olt: Olt) {
        self.tables.write().await.olts.insert(
            olt.id,
            OltEntry {
                olt,
                reachable: None,
            },
        );
    }

    pub async fn add_port(&self, port: PonPort) {
        self.tables.write().await.ports.insert(port.id, port);
    }

    pub async fn olt(&self, olt_id: i64) -> Option<Olt> {
        self.tables
            .read()
            .await
            .olts
            .get(&olt_id)
            .map(|entry| entry.olt.clone())
    }

    pub async fn olt_reachable(&self, olt_id: i64) -> Option<bool> {
        self.tables
            .read()
            .await
            .olts
            .get(&olt_id)
            .and_then(|entry| entry.reachable)
    }

    /// Number of ports with a recorded state
    pub async fn state_count(&self) -> usize {
        self.tables.read().await.states.len()
    }
}

#[async_trait]
impl Inventory for MemoryStore {
    async fn fetch_active_olts(&self) -> StorageResult<Vec<Olt>> {
        let tables = self.tables.read().await;
        let mut olts: Vec<Olt> = tables
            .olts
            .values()
            .filter(|entry| entry.olt.status == OltStatus::Active)
            .map(|entry| entry.olt.clone())
            .collect();
        olts.sort_by_key(|olt| olt.id);
        Ok(olts)
    }

    async fn fetch_active_ports(&self, olt_id: i64) -> StorageResult<Vec<PonPort>> {
        let tables = self.tables.read().await;
        let mut ports: Vec<PonPort> = tables
            .ports
            .values()
            .filter(|port| port.olt_id == olt_id && port.status == PortStatus::Active)
            .cloned()
            .collect();
        ports.sort_by_key(|port| port.index);
        Ok(ports)
    }

    async fn record_olt_poll(
        &self,
        olt_id: i64,
        at: DateTime<Utc>,
        reachable: bool,
    ) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(entry) = tables.olts.get_mut(&olt_id) {
            entry.olt.last_poll = Some(at);
            entry.reachable = Some(reachable);
        }
        Ok(())
    }
}

#[async_trait]
impl StateSink for MemoryStore {
    async fn upsert_port_state(&self, snapshot: &PortSnapshot) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.ports.contains_key(&snapshot.port_id) {
            return Err(StorageError::QueryFailed(format!(
                "port {} is not in the inventory",
                snapshot.port_id
            )));
        }

        debug!("in-memory store: state for port {}", snapshot.port_id);
        tables.states.insert(snapshot.port_id, snapshot.clone());
        Ok(())
    }

    async fn latest_state(&self, port_id: i64) -> StorageResult<Option<PortSnapshot>> {
        Ok(self.tables.read().await.states.get(&port_id).cloned())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let tables = self.tables.read().await;
        let mut status = HealthStatus::ok("in-memory store operational");
        status
            .metadata
            .insert("backend".to_string(), "memory".to_string());
        status
            .metadata
            .insert("ports".to_string(), tables.ports.len().to_string());
        Ok(status)
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}
