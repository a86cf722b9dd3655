//! End-to-end cycles through reader, scoring, thresholds, sinks and alerts

use std::sync::Arc;
use std::time::Duration;

use pon_poller::{
    AlertKind,
    actors::PollerHandle,
    device::RawValue,
    storage::{Sink, StateSink, cache::MemoryCache, influx::InfluxSink},
    vendors::{Metric, Vendor},
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn zte_port(index: u32, temperature_c: i64) -> std::collections::HashMap<String, RawValue> {
    readings(
        Vendor::Zte,
        index,
        &[
            (Metric::Temperature, RawValue::Integer(temperature_c * 256)),
            (Metric::Voltage, RawValue::Integer(33_000)),
            (Metric::TxPower, RawValue::Integer(250)),
            (Metric::RxPower, RawValue::Integer(-2_000)),
        ],
    )
}

async fn seed_zte_olt(sinks: &TestSinks) {
    sinks.store.add_olt(create_test_olt(1, "ZTE")).await;
    sinks.store.add_port(create_test_port(1, 1, 1)).await;
    sinks.store.add_port(create_test_port(2, 1, 2)).await;
}

fn zte_client() -> Arc<ScriptedClient> {
    Arc::new(ScriptedClient::new().with_device(
        &olt_address(1),
        Device::Answer(merge(vec![zte_port(1, 75), zte_port(2, 45)])),
    ))
}

#[tokio::test]
async fn test_cycle_writes_every_sink_and_raises_alerts() {
    let cache = Arc::new(MemoryCache::new());
    let sinks = TestSinks::new(cache.clone());
    seed_zte_olt(&sinks).await;

    let report = sinks.pipeline(zte_client()).run_cycle(INTERVAL).await;

    assert_eq!(report.olts_ok, 1);
    assert_eq!(report.olts_failed, 0);
    assert_eq!(report.ports_polled, 2);
    assert_eq!(report.ports_no_data, 0);
    assert_eq!(report.alerts_emitted, 1);

    // latest state
    let hot = sinks.store.latest_state(1).await.unwrap().unwrap();
    assert_eq!(hot.metrics.temperature, Some(75.0));
    assert_eq!(hot.metrics.rx_power, Some(-20.0));
    assert_eq!(hot.metrics.utilization, None);
    assert_eq!(hot.health_score.value(), 80);

    let cool = sinks.store.latest_state(2).await.unwrap().unwrap();
    assert_eq!(cool.health_score.value(), 100);

    // time-series
    let points = sinks.time_series.points();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0], hot);

    // cache
    let cached = cache.get(1).await.unwrap();
    assert_eq!(cached["temperature"], "75");
    assert_eq!(cached["health_score"], "80");
    assert!(!cached.contains_key("utilization"));

    // alerts
    let alerts = sinks.alerts.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::Temperature);
    assert_eq!(alerts[0].message, "Temperature high: 75.0°C");
    assert_eq!(alerts[0].port.port_id, 1);

    // liveness write-back
    assert_eq!(sinks.store.olt_reachable(1).await, Some(true));
    assert!(sinks.store.olt(1).await.unwrap().last_poll.is_some());
}

#[tokio::test]
async fn test_alerts_repeat_every_cycle() {
    let sinks = TestSinks::new(Arc::new(MemoryCache::new()));
    seed_zte_olt(&sinks).await;
    let pipeline = sinks.pipeline(zte_client());

    pipeline.run_cycle(INTERVAL).await;
    pipeline.run_cycle(INTERVAL).await;

    assert_eq!(sinks.alerts.alerts().len(), 2);
    assert_eq!(sinks.time_series.points().len(), 4);
}

#[tokio::test]
async fn test_points_reach_influx() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/write"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let sinks = TestSinks::new(Arc::new(MemoryCache::new()));
    seed_zte_olt(&sinks).await;

    let influx = InfluxSink::new(&pon_poller::config::InfluxConfig {
        url: server.uri(),
        token: "token".to_string(),
        org: "pon".to_string(),
        bucket: "pon_monitoring".to_string(),
    })
    .unwrap();

    let reader = pon_poller::monitors::reader::MetricReader::new(zte_client(), READ_TIMEOUT);
    let writer = pon_poller::storage::MultiSinkWriter::new(
        sinks.store.clone(),
        Some(Arc::new(influx)),
        sinks.cache.clone(),
    );
    let pipeline = pon_poller::actors::Pipeline::new(
        sinks.store.clone(),
        Arc::new(pon_poller::vendors::VendorRegistry::builtin()),
        reader,
        writer.clone(),
        sinks.alerts.clone(),
    );

    let report = pipeline.run_cycle(INTERVAL).await;

    assert_eq!(report.ports_polled, 2);
    assert_eq!(writer.stats().get(Sink::TimeSeries).writes, 2);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.starts_with("pon_port_metrics,pon_port_id=1,olt_id=1,"));
    assert!(body.contains("health_score=80i"));
}

#[tokio::test]
async fn test_scheduled_actor_publishes_reports() {
    let sinks = TestSinks::new(Arc::new(MemoryCache::new()));
    seed_zte_olt(&sinks).await;

    let handle = PollerHandle::spawn(sinks.pipeline(zte_client()), INTERVAL);
    let mut reports = handle.subscribe();

    let report = tokio::time::timeout(Duration::from_secs(5), reports.recv())
        .await
        .expect("first cycle should start immediately")
        .unwrap();

    assert_eq!(report.ports_polled, 2);
    assert!(report.next_delay > Duration::from_secs(50));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_poll_now_between_scheduled_cycles() {
    let sinks = TestSinks::new(Arc::new(MemoryCache::new()));
    seed_zte_olt(&sinks).await;

    let handle = PollerHandle::spawn(sinks.pipeline(zte_client()), INTERVAL);

    let first = handle.poll_now().await.unwrap();
    let second = handle.poll_now().await.unwrap();

    assert_eq!(first.ports_polled, 2);
    assert_eq!(second.ports_polled, 2);
    assert!(second.started_at >= first.started_at);

    handle.shutdown().await.unwrap();
}
