//! Failure isolation between OLTs, ports and sinks

use std::sync::Arc;

use pon_poller::{
    device::RawValue,
    storage::{Sink, StateSink, cache::MemoryCache},
    vendors::{Metric, Vendor},
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn fiberhome_port(index: u32) -> std::collections::HashMap<String, RawValue> {
    readings(
        Vendor::FiberHome,
        index,
        &[
            (Metric::Temperature, RawValue::Integer(4_200)),
            (Metric::RxPower, RawValue::Integer(-2_150)),
            (Metric::BytesIn, RawValue::Unsigned(75_000_000)),
            (Metric::BytesOut, RawValue::Unsigned(75_000_000)),
        ],
    )
}

async fn seed(sinks: &TestSinks, olt_id: i64, vendor: &str, ports: &[(i64, u32)]) {
    sinks.store.add_olt(create_test_olt(olt_id, vendor)).await;
    for (port_id, index) in ports {
        sinks
            .store
            .add_port(create_test_port(*port_id, olt_id, *index))
            .await;
    }
}

#[tokio::test]
async fn test_crashing_olt_does_not_affect_the_others() {
    let healthy = || Device::Answer(merge(vec![fiberhome_port(1), fiberhome_port(2)]));

    // baseline: only the healthy OLT
    let baseline_sinks = TestSinks::new(Arc::new(MemoryCache::new()));
    seed(&baseline_sinks, 1, "FIBERHOME", &[(11, 1), (12, 2)]).await;
    let baseline = baseline_sinks
        .pipeline(Arc::new(
            ScriptedClient::new().with_device(&olt_address(1), healthy()),
        ))
        .run_cycle(INTERVAL)
        .await;

    // same OLT next to a crashing one and an unsupported one
    let sinks = TestSinks::new(Arc::new(MemoryCache::new()));
    seed(&sinks, 1, "FIBERHOME", &[(11, 1), (12, 2)]).await;
    seed(&sinks, 2, "FIBERHOME", &[(21, 1)]).await;
    seed(&sinks, 3, "HUAWEI", &[(31, 1)]).await;

    let client = ScriptedClient::new()
        .with_device(&olt_address(1), healthy())
        .with_device(&olt_address(2), Device::Panic)
        .with_device(&olt_address(3), healthy());
    let report = sinks.pipeline(Arc::new(client)).run_cycle(INTERVAL).await;

    assert_eq!(report.olts_ok, 1);
    assert_eq!(report.olts_failed, 2);
    assert_eq!(report.ports_polled, baseline.ports_polled);
    assert_eq!(report.alerts_emitted, baseline.alerts_emitted);

    for port_id in [11, 12] {
        let state = sinks.store.latest_state(port_id).await.unwrap().unwrap();
        let expected = baseline_sinks
            .store
            .latest_state(port_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.metrics, expected.metrics);
        assert_eq!(state.health_score, expected.health_score);
    }

    assert_eq!(sinks.store.latest_state(21).await.unwrap(), None);
    assert_eq!(sinks.store.latest_state(31).await.unwrap(), None);

    // a failed OLT gets no last-poll write-back
    assert!(sinks.store.olt(2).await.unwrap().last_poll.is_none());
    assert!(sinks.store.olt(3).await.unwrap().last_poll.is_none());
}

#[tokio::test]
async fn test_unreachable_olt_counts_ports_without_data() {
    let sinks = TestSinks::new(Arc::new(MemoryCache::new()));
    seed(&sinks, 1, "V-SOL", &[(11, 1), (12, 2)]).await;

    let client = ScriptedClient::new().with_device(&olt_address(1), Device::Unreachable);
    let report = sinks.pipeline(Arc::new(client)).run_cycle(INTERVAL).await;

    assert_eq!(report.olts_ok, 1);
    assert_eq!(report.ports_polled, 0);
    assert_eq!(report.ports_no_data, 2);
    assert_eq!(sinks.store.state_count().await, 0);
    assert!(sinks.time_series.points().is_empty());
    assert_eq!(sinks.store.olt_reachable(1).await, Some(false));
}

#[tokio::test]
async fn test_cache_failure_does_not_block_other_sinks() {
    let sinks = TestSinks::new(Arc::new(FailingCache));
    seed(&sinks, 1, "FiberHome", &[(11, 1), (12, 2)]).await;

    let client = ScriptedClient::new().with_device(
        &olt_address(1),
        Device::Answer(merge(vec![fiberhome_port(1), fiberhome_port(2)])),
    );
    let pipeline = sinks.pipeline(Arc::new(client));
    let report = pipeline.run_cycle(INTERVAL).await;

    // persistence failures are not polling failures
    assert_eq!(report.olts_ok, 1);
    assert_eq!(report.ports_polled, 2);

    assert_eq!(sinks.store.state_count().await, 2);
    assert_eq!(sinks.time_series.points().len(), 2);

    let stats = pipeline.writer().stats();
    assert_eq!(stats.get(Sink::Cache).failures, 2);
    assert_eq!(stats.get(Sink::State).writes, 2);
    assert_eq!(stats.get(Sink::TimeSeries).writes, 2);
}

#[tokio::test]
async fn test_partial_reads_keep_absent_metrics_absent() {
    let sinks = TestSinks::new(Arc::new(MemoryCache::new()));
    seed(&sinks, 1, "FIBERHOME", &[(11, 1)]).await;

    let only_temperature = readings(
        Vendor::FiberHome,
        1,
        &[(Metric::Temperature, RawValue::Integer(6_500))],
    );
    let client = ScriptedClient::new().with_device(&olt_address(1), Device::Answer(only_temperature));
    sinks.pipeline(Arc::new(client)).run_cycle(INTERVAL).await;

    let state = sinks.store.latest_state(11).await.unwrap().unwrap();
    assert_eq!(state.metrics.temperature, Some(65.0));
    assert_eq!(state.metrics.rx_power, None);
    assert_eq!(state.metrics.tx_power, None);
    assert_eq!(state.metrics.utilization, None);
    assert_eq!(state.health_score.value(), 90);
}

#[tokio::test(start_paused = true)]
async fn test_utilization_from_traffic_counters() {
    let sinks = TestSinks::new(Arc::new(MemoryCache::new()));
    seed(&sinks, 1, "FIBERHOME", &[(11, 1)]).await;

    let client = Arc::new(
        ScriptedClient::new().with_device(&olt_address(1), Device::Answer(fiberhome_port(1))),
    );
    let pipeline = sinks.pipeline(client.clone());

    // first sample only sets the counter baseline
    pipeline.run_cycle(INTERVAL).await;
    let state = sinks.store.latest_state(11).await.unwrap().unwrap();
    assert_eq!(state.metrics.bandwidth_in, None);
    assert_eq!(state.metrics.utilization, None);

    let mut next = fiberhome_port(1);
    next.extend(readings(
        Vendor::FiberHome,
        1,
        &[
            (Metric::BytesIn, RawValue::Unsigned(150_000_000)),
            (Metric::BytesOut, RawValue::Unsigned(150_000_000)),
        ],
    ));
    client.set_device(&olt_address(1), Device::Answer(next));
    tokio::time::advance(INTERVAL).await;
    pipeline.run_cycle(INTERVAL).await;

    // 150 MB over 60 s is 20 Mbps of a 2500 Mbps port
    let state = sinks.store.latest_state(11).await.unwrap().unwrap();
    assert_eq!(state.metrics.bandwidth_in, Some(10_000_000));
    assert_eq!(state.metrics.bandwidth_out, Some(10_000_000));
    let utilization = state.metrics.utilization.unwrap();
    assert!((utilization - 0.8).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_long_running_counters_on_idle_port_raise_nothing() {
    let sinks = TestSinks::new(Arc::new(MemoryCache::new()));
    seed(&sinks, 1, "ZTE", &[(11, 1)]).await;

    let idle = readings(
        Vendor::Zte,
        1,
        &[
            (Metric::BytesIn, RawValue::Unsigned(500_000_000_000)),
            (Metric::BytesOut, RawValue::Unsigned(500_000_000_000)),
        ],
    );
    let client = ScriptedClient::new().with_device(&olt_address(1), Device::Answer(idle));
    let pipeline = sinks.pipeline(Arc::new(client));

    for _ in 0..2 {
        let report = pipeline.run_cycle(INTERVAL).await;
        assert_eq!(report.alerts_emitted, 0);
        tokio::time::advance(INTERVAL).await;
    }

    let state = sinks.store.latest_state(11).await.unwrap().unwrap();
    assert_eq!(state.metrics.bandwidth_in, Some(0));
    assert_eq!(state.metrics.utilization, Some(0.0));
    assert_eq!(state.health_score.value(), 100);
    assert!(sinks.alerts.alerts().is_empty());
}

#[tokio::test]
async fn test_inventory_failure_yields_empty_cycle() {
    let sinks = TestSinks::new(Arc::new(MemoryCache::new()));
    let pipeline =
        sinks.pipeline_with_inventory(Arc::new(ScriptedClient::new()), Arc::new(BrokenInventory));

    let report = pipeline.run_cycle(INTERVAL).await;

    assert_eq!(report.olts_ok, 0);
    assert_eq!(report.olts_failed, 0);
    assert_eq!(report.ports_polled, 0);
}
