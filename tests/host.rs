use hostpulse::{
    AsyncDataCollector, Batch, HostCollector, MemoryDiagnostics, SysinfoSource, Validatable,
    CPU_USAGE, MEMORY_TOTAL, MEMORY_USAGE, NETWORK_BYTES_RECV,
};
use std::sync::Arc;
use std::time::Duration;

fn live_collector() -> HostCollector {
    HostCollector::new(Arc::new(SysinfoSource::new()), Arc::new(MemoryDiagnostics::new()))
        .cpu_window(Duration::from_millis(250))
}

fn received(batch: &Batch, interface: &str) -> Option<f64> {
    batch
        .iter()
        .find(|s| s.name() == NETWORK_BYTES_RECV && s.tag("interface") == Some(interface))
        .map(|s| s.value())
}

#[tokio::test]
async fn live_host_batch_is_well_formed() {
    let mut collector = live_collector();
    assert!(collector.health_check().await);

    let batch = collector.collect().await.unwrap();
    assert!(batch.iter().all(|s| s.is_valid() && !s.name().is_empty()));

    let cpus: Vec<_> = batch.iter().filter(|s| s.name() == CPU_USAGE).collect();
    assert!(!cpus.is_empty());
    assert!(cpus.iter().all(|s| (0.0..=100.0).contains(&s.value())));
    assert!(cpus.iter().all(|s| s.tag("core").is_some_and(|core| core.starts_with("cpu"))));

    let total = batch.iter().find(|s| s.name() == MEMORY_TOTAL).unwrap();
    let used = batch.iter().find(|s| s.name() == MEMORY_USAGE).unwrap();
    assert!(total.value() > 0.0);
    assert_eq!(used.tag("type"), Some("used"));
}

#[tokio::test]
async fn live_counters_do_not_go_backwards() {
    let mut collector = live_collector();
    let first = collector.collect().await.unwrap();
    let second = collector.collect().await.unwrap();

    for sample in first.iter().filter(|s| s.name() == NETWORK_BYTES_RECV) {
        let interface = sample.tag("interface").unwrap();
        if let Some(later) = received(&second, interface) {
            assert!(later >= sample.value(), "{interface} counter went backwards");
        }
    }
}
