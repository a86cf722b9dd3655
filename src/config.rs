use std::path::PathBuf;
use std::time::Duration;

use tracing::level_filters::LevelFilter;
use tracing::trace;

use crate::util::{env_lookup, non_empty, parse_or};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_DEVICE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_DEVICE_PORT: u16 = 161;
const DEFAULT_STATE_POOL_SIZE: u32 = 10;

/// Time-series sink connection parameters
#[derive(Debug, Clone, PartialEq)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

/// Latest-state / inventory store parameters
#[derive(Debug, Clone, PartialEq)]
pub struct StateConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    pub pool_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub poll_interval: Duration,
    pub device_timeout: Duration,
    pub device_port: u16,
    pub state: StateConfig,
    /// `None` falls back to the in-process cache
    pub redis_url: Option<String>,
    /// `None` disables time-series writes
    pub influx: Option<InfluxConfig>,
    pub alert_webhook_url: Option<String>,
    pub log_level: LevelFilter,
}

impl Config {
    /// Load `.env` (if any) and resolve the configuration from the process
    /// environment.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenv::dotenv() {
            trace!("loaded environment from {}", path.display());
        }
        Self::from_lookup(env_lookup)
    }

    /// Resolve the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval_secs = parse_or(&lookup, "POLL_INTERVAL", DEFAULT_POLL_INTERVAL_SECS).max(1);

        let influx = non_empty(&lookup, "INFLUXDB_URL").map(|url| InfluxConfig {
            url,
            token: non_empty(&lookup, "INFLUXDB_TOKEN").unwrap_or_default(),
            org: non_empty(&lookup, "INFLUXDB_ORG").unwrap_or_else(|| "pon".to_string()),
            bucket: non_empty(&lookup, "INFLUXDB_BUCKET")
                .unwrap_or_else(|| "pon_monitoring".to_string()),
        });

        let config = Self {
            poll_interval: Duration::from_secs(interval_secs),
            device_timeout: Duration::from_millis(parse_or(
                &lookup,
                "DEVICE_TIMEOUT_MS",
                DEFAULT_DEVICE_TIMEOUT_MS,
            )),
            device_port: parse_or(&lookup, "DEVICE_PORT", DEFAULT_DEVICE_PORT),
            state: StateConfig {
                path: non_empty(&lookup, "STATE_DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./pon_poller.db")),
                pool_size: parse_or(&lookup, "STATE_POOL_SIZE", DEFAULT_STATE_POOL_SIZE).max(1),
            },
            redis_url: non_empty(&lookup, "REDIS_URL"),
            influx,
            alert_webhook_url: non_empty(&lookup, "ALERT_WEBHOOK_URL"),
            log_level: parse_or(&lookup, "LOG_LEVEL", LevelFilter::INFO),
        };

        trace!("resolved config: {config:?}");
        config
    }
}
