//! Short-lived per-port snapshot cache
//!
//! Key `port:<id>:metrics` holds a hash of string-encoded fields plus an
//! RFC 3339 `timestamp`. Every write replaces the whole hash and re-arms a
//! 300 second expiry, so a reader that finds nothing knows the port has
//! missed its recent polls.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::backend::{CacheSink, HealthStatus};
use super::error::{StorageError, StorageResult};
use super::schema::{FieldValue, PortSnapshot};

pub const CACHE_TTL: Duration = Duration::from_secs(300);

pub fn cache_key(port_id: i64) -> String {
    format!("port:{port_id}:metrics")
}

/// String form of a snapshot. Absent metrics are omitted.
pub fn cache_fields(snapshot: &PortSnapshot) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = snapshot
        .present_fields()
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                FieldValue::Float(v) => v.to_string(),
                FieldValue::Unsigned(v) => v.to_string(),
            };
            (name.to_string(), value)
        })
        .collect();

    fields.push((
        "health_score".to_string(),
        snapshot.health_score.value().to_string(),
    ));
    fields.push(("timestamp".to_string(), snapshot.polled_at.to_rfc3339()));
    fields
}

/// Atomic replace of a port's hash: `DEL`, `HSET` every field, then re-arm
/// the expiry.
pub fn snapshot_pipeline(snapshot: &PortSnapshot) -> redis::Pipeline {
    let key = cache_key(snapshot.port_id);
    let mut pipe = redis::pipe();
    pipe.atomic()
        .del(&key)
        .ignore()
        .cmd("HSET")
        .arg(&key)
        .arg(cache_fields(snapshot))
        .ignore()
        .expire(&key, CACHE_TTL.as_secs() as i64)
        .ignore();
    pipe
}

pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    #[instrument(skip_all)]
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        info!("connected to redis cache");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheSink for RedisCache {
    #[instrument(skip_all, fields(port = snapshot.port_id))]
    async fn put_snapshot(&self, snapshot: &PortSnapshot) -> StorageResult<()> {
        let mut connection = self.connection.clone();
        let _: () = snapshot_pipeline(snapshot)
            .query_async(&mut connection)
            .await?;

        Ok(())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let mut connection = self.connection.clone();
        let reply: Result<String, _> = redis::cmd("PING").query_async(&mut connection).await;

        match reply {
            Ok(_) => {
                let mut status = HealthStatus::ok("redis cache operational");
                status
                    .metadata
                    .insert("backend".to_string(), "redis".to_string());
                Ok(status)
            }
            Err(e) => {
                warn!("cache health check failed: {}", e);
                Ok(HealthStatus::failed(format!("health check failed: {e}")))
            }
        }
    }
}

/// In-process cache with the same key, field and expiry rules
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (HashMap<String, String>, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_ttl(CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached fields of a port, `None` once expired
    pub async fn get(&self, port_id: i64) -> Option<HashMap<String, String>> {
        let mut entries = self.entries.lock().await;
        let key = cache_key(port_id);

        match entries.get(&key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(&key);
                None
            }
            Some((fields, _)) => Some(fields.clone()),
            None => None,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheSink for MemoryCache {
    async fn put_snapshot(&self, snapshot: &PortSnapshot) -> StorageResult<()> {
        let fields = cache_fields(snapshot).into_iter().collect();
        self.entries.lock().await.insert(
            cache_key(snapshot.port_id),
            (fields, Instant::now() + self.ttl),
        );
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let mut status = HealthStatus::ok("in-process cache operational");
        status
            .metadata
            .insert("backend".to_string(), "memory".to_string());
        Ok(status)
    }
}
