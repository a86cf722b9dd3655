use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use pon_poller::{
    actors::{Pipeline, PollerHandle},
    alerts::{AlertDispatcher, LogDispatcher, WebhookDispatcher},
    config::Config,
    device::snmp::SnmpClient,
    monitors::reader::MetricReader,
    storage::{
        CacheSink, MultiSinkWriter, StateSink, TimeSeriesSink,
        cache::{MemoryCache, RedisCache},
        influx::InfluxSink,
        sqlite::SqliteStore,
    },
    vendors::VendorRegistry,
};
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Poll interval in seconds, overrides POLL_INTERVAL
    #[arg(long)]
    interval: Option<u64>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_targets(vec![("pon_poller", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(secs) = args.interval {
        config.poll_interval = Duration::from_secs(secs.max(1));
    }

    init(config.log_level);
    trace!("started with args: {args:?}");

    let pipeline = build_pipeline(&config).await?;

    if args.once {
        let handle = PollerHandle::spawn_manual(pipeline, config.poll_interval);
        let report = handle.poll_now().await?;
        handle.shutdown().await?;
        if report.olts_failed > 0 {
            warn!("{} OLTs failed", report.olts_failed);
        }
        return Ok(());
    }

    info!("polling every {}s", config.poll_interval.as_secs());
    let handle = PollerHandle::spawn(pipeline, config.poll_interval);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutdown requested, waiting for the running cycle");
    handle.shutdown().await?;

    Ok(())
}

/// Connect every store. Any store that cannot be reached here is fatal.
async fn build_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let store = Arc::new(
        SqliteStore::new(&config.state.path, config.state.pool_size)
            .await
            .context("cannot open state store")?,
    );
    let health = store.health_check().await?;
    if !health.healthy {
        bail!("state store unhealthy: {}", health.message);
    }

    let cache: Arc<dyn CacheSink> = match &config.redis_url {
        Some(url) => {
            let cache = RedisCache::connect(url)
                .await
                .context("cannot connect to cache")?;
            let health = cache.health_check().await?;
            if !health.healthy {
                bail!("cache unhealthy: {}", health.message);
            }
            Arc::new(cache)
        }
        None => {
            warn!("REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    let time_series: Option<Arc<dyn TimeSeriesSink>> = match &config.influx {
        Some(influx) => Some(Arc::new(
            InfluxSink::new(influx).context("cannot build time-series client")?,
        )),
        None => {
            warn!("INFLUXDB_URL not set, time-series writes are disabled");
            None
        }
    };

    let alerts: Arc<dyn AlertDispatcher> = match &config.alert_webhook_url {
        Some(url) => Arc::new(WebhookDispatcher::new(url.clone())),
        None => Arc::new(LogDispatcher),
    };

    let registry = VendorRegistry::builtin();
    info!("supported vendors: {}", registry.supported_vendors().join(", "));

    let reader = MetricReader::new(
        Arc::new(SnmpClient::new(config.device_port)),
        config.device_timeout,
    );
    let writer = MultiSinkWriter::new(store.clone(), time_series, cache);

    Ok(Pipeline::new(
        store,
        Arc::new(registry),
        reader,
        writer,
        alerts,
    ))
}
