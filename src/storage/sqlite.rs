//! SQLite backend for the inventory and the latest-state store
//!
//! Both live in the same database file: `olts` and `pon_ports` are owned by
//! the inventory, and the metric columns of `pon_ports` hold the latest
//! polled state. Schema is applied with the embedded migrations on open.
//!
//! - **WAL mode**: readers are not blocked by the per-port updates
//! - **Bounded pool**: concurrent OLT polls wait for a connection instead of
//!   failing when the pool is exhausted

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, Inventory, StateSink};
use super::error::{StorageError, StorageResult};
use super::schema::PortSnapshot;
use crate::{
    HealthScore, NormalizedMetricSet, Olt, OltStatus, PonPort, PortStatus, PortThresholds,
};

pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and apply migrations.
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>, pool_size: u32) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size.max(1))
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        info!("SQLite store ready");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    /// Insert or replace an OLT inventory row
    pub async fn add_olt(&self, olt: &Olt) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO olts (id, name, vendor, ip_address, snmp_community, status, last_poll)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                vendor = excluded.vendor,
                ip_address = excluded.ip_address,
                snmp_community = excluded.snmp_community,
                status = excluded.status
            "#,
        )
        .bind(olt.id)
        .bind(&olt.name)
        .bind(&olt.vendor)
        .bind(&olt.address)
        .bind(&olt.credential)
        .bind(olt.status.as_str())
        .bind(olt.last_poll.as_ref().map(timestamp_to_millis))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace a port inventory row; polled state is left untouched
    pub async fn add_port(&self, port: &PonPort) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pon_ports (
                id, olt_id, port_name, port_number, status,
                threshold_temperature_high, threshold_utilization_high, threshold_rx_power_low
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                olt_id = excluded.olt_id,
                port_name = excluded.port_name,
                port_number = excluded.port_number,
                status = excluded.status,
                threshold_temperature_high = excluded.threshold_temperature_high,
                threshold_utilization_high = excluded.threshold_utilization_high,
                threshold_rx_power_low = excluded.threshold_rx_power_low
            "#,
        )
        .bind(port.id)
        .bind(port.olt_id)
        .bind(&port.name)
        .bind(i64::from(port.index))
        .bind(port.status.as_str())
        .bind(port.thresholds.temperature_high)
        .bind(port.thresholds.utilization_high)
        .bind(port.thresholds.rx_power_low)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Liveness recorded by the last poll of an OLT, `None` if never polled
    pub async fn olt_reachable(&self, olt_id: i64) -> StorageResult<Option<bool>> {
        let row: Option<(Option<bool>,)> =
            sqlx::query_as("SELECT reachable FROM olts WHERE id = ?")
                .bind(olt_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(reachable,)| reachable))
    }
}

fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

fn millis_to_timestamp(millis: i64) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::SerializationError(format!("invalid timestamp {millis}")))
}

fn olt_from_row(row: &SqliteRow) -> StorageResult<Olt> {
    let last_poll = row
        .try_get::<Option<i64>, _>("last_poll")?
        .map(millis_to_timestamp)
        .transpose()?;

    Ok(Olt {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        vendor: row.try_get("vendor")?,
        address: row.try_get("ip_address")?,
        credential: row.try_get("snmp_community")?,
        status: OltStatus::from_db(row.try_get("status")?),
        last_poll,
    })
}

fn port_from_row(row: &SqliteRow) -> StorageResult<PonPort> {
    let port_number: i64 = row.try_get("port_number")?;
    let index = u32::try_from(port_number).map_err(|_| {
        StorageError::SerializationError(format!("port number out of range: {port_number}"))
    })?;

    Ok(PonPort {
        id: row.try_get("id")?,
        olt_id: row.try_get("olt_id")?,
        name: row.try_get("port_name")?,
        index,
        status: PortStatus::from_db(row.try_get("status")?),
        thresholds: PortThresholds {
            temperature_high: row.try_get("threshold_temperature_high")?,
            utilization_high: row.try_get("threshold_utilization_high")?,
            rx_power_low: row.try_get("threshold_rx_power_low")?,
        },
    })
}

fn snapshot_from_row(row: &SqliteRow, polled_at: DateTime<Utc>) -> StorageResult<PortSnapshot> {
    let counter = |name: &str| -> StorageResult<Option<u64>> {
        Ok(row.try_get::<Option<i64>, _>(name)?.map(|v| v as u64))
    };
    let count = |name: &str| -> StorageResult<Option<u32>> {
        Ok(row.try_get::<Option<i64>, _>(name)?.map(|v| v as u32))
    };

    let metrics = NormalizedMetricSet {
        temperature: row.try_get("temperature")?,
        voltage: row.try_get("voltage")?,
        tx_power: row.try_get("tx_power")?,
        rx_power: row.try_get("rx_power")?,
        utilization: row.try_get("utilization")?,
        bandwidth_in: counter("bandwidth_in")?,
        bandwidth_out: counter("bandwidth_out")?,
        online_onus: count("online_onus")?,
        offline_onus: count("offline_onus")?,
        total_onus: count("total_onus")?,
    };

    let health_score: Option<i64> = row.try_get("health_score")?;

    Ok(PortSnapshot {
        port_id: row.try_get("id")?,
        olt_id: row.try_get("olt_id")?,
        port_name: row.try_get("port_name")?,
        metrics,
        health_score: HealthScore::new(health_score.unwrap_or(0) as i32),
        polled_at,
    })
}

#[async_trait]
impl Inventory for SqliteStore {
    #[instrument(skip(self))]
    async fn fetch_active_olts(&self) -> StorageResult<Vec<Olt>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, vendor, ip_address, snmp_community, status, last_poll
            FROM olts
            WHERE status = 'active'
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let olts = rows.iter().map(olt_from_row).collect::<StorageResult<Vec<_>>>()?;
        debug!("inventory returned {} active OLTs", olts.len());
        Ok(olts)
    }

    #[instrument(skip(self))]
    async fn fetch_active_ports(&self, olt_id: i64) -> StorageResult<Vec<PonPort>> {
        let rows = sqlx::query(
            r#"
            SELECT id, olt_id, port_name, port_number, status,
                   threshold_temperature_high, threshold_utilization_high, threshold_rx_power_low
            FROM pon_ports
            WHERE olt_id = ? AND status = 'active'
            ORDER BY port_number
            "#,
        )
        .bind(olt_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(port_from_row).collect()
    }

    async fn record_olt_poll(
        &self,
        olt_id: i64,
        at: DateTime<Utc>,
        reachable: bool,
    ) -> StorageResult<()> {
        sqlx::query("UPDATE olts SET last_poll = ?, reachable = ? WHERE id = ?")
            .bind(timestamp_to_millis(&at))
            .bind(reachable)
            .bind(olt_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl StateSink for SqliteStore {
    #[instrument(skip_all, fields(port = snapshot.port_id))]
    async fn upsert_port_state(&self, snapshot: &PortSnapshot) -> StorageResult<()> {
        let m = &snapshot.metrics;

        let result = sqlx::query(
            r#"
            UPDATE pon_ports SET
                temperature = ?,
                voltage = ?,
                tx_power = ?,
                rx_power = ?,
                utilization = ?,
                bandwidth_in = ?,
                bandwidth_out = ?,
                online_onus = ?,
                offline_onus = ?,
                total_onus = ?,
                health_score = ?,
                last_poll = ?
            WHERE id = ?
            "#,
        )
        .bind(m.temperature)
        .bind(m.voltage)
        .bind(m.tx_power)
        .bind(m.rx_power)
        .bind(m.utilization)
        .bind(m.bandwidth_in.map(|v| v as i64))
        .bind(m.bandwidth_out.map(|v| v as i64))
        .bind(m.online_onus.map(i64::from))
        .bind(m.offline_onus.map(i64::from))
        .bind(m.total_onus.map(i64::from))
        .bind(i64::from(snapshot.health_score.value()))
        .bind(timestamp_to_millis(&snapshot.polled_at))
        .bind(snapshot.port_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::QueryFailed(format!(
                "port {} is not in the inventory",
                snapshot.port_id
            )));
        }

        Ok(())
    }

    async fn latest_state(&self, port_id: i64) -> StorageResult<Option<PortSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT id, olt_id, port_name,
                   temperature, voltage, tx_power, rx_power, utilization,
                   bandwidth_in, bandwidth_out, online_onus, offline_onus, total_onus,
                   health_score, last_poll
            FROM pon_ports
            WHERE id = ?
            "#,
        )
        .bind(port_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        match row.try_get::<Option<i64>, _>("last_poll")? {
            Some(millis) => snapshot_from_row(&row, millis_to_timestamp(millis)?).map(Some),
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite store operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus::failed(format!("health check failed: {e}")))
            }
        }
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite store");
        self.pool.close().await;
        Ok(())
    }
}
