use sawtooth_memory::utils::validation::Validate;
use sawtooth_memory::{
    generate_and_discard, ExporterKind, GeneratorConfig, GeneratorStats, MetricsRegistrar,
    TelemetryConfig,
};
use std::sync::Arc;
use std::time::Duration;

fn telemetry_config(exporter: ExporterKind) -> TelemetryConfig {
    TelemetryConfig {
        service_name: "sawtooth-test".to_string(),
        service_version: "9.9.9".to_string(),
        exporter,
        ..TelemetryConfig::default()
    }
}

#[tokio::test]
async fn test_registrar_attaches_every_observer() {
    let stats = Arc::new(GeneratorStats::new());
    let registrar = MetricsRegistrar::install(
        &telemetry_config(ExporterKind::None),
        &GeneratorConfig::default(),
        Arc::clone(&stats),
    )
    .expect("install registrar");

    generate_and_discard(10_000, &stats).expect("cycle runs");
    let snapshot = registrar.snapshot().expect("snapshot");

    for name in [
        "cpu_process_usage_percent",
        "cpu_system_usage_percent",
        "memory_pool_usage_bytes",
        "thread_runtime_workers",
        "thread_runtime_alive_tasks",
        "heap_live_bytes",
        "heap_deallocations_total",
        "generator_batch_size",
        "generator_period_seconds",
        "generator_cycles_total",
        "generator_records_live",
    ] {
        assert!(snapshot.find(name).next().is_some(), "{} missing", name);
    }

    let cycles = snapshot.find("generator_cycles_total").next().unwrap();
    assert_eq!(cycles.value, 1.0);
    assert_eq!(cycles.kind, "counter");

    let batch = snapshot.find("generator_batch_size").next().unwrap();
    assert_eq!(batch.value, 10_000.0);
    assert_eq!(
        batch.labels.get("service_name").map(String::as_str),
        Some("sawtooth-test")
    );
    assert_eq!(
        batch.labels.get("service_version").map(String::as_str),
        Some("9.9.9")
    );

    let pools: Vec<&str> = snapshot
        .find("memory_pool_usage_bytes")
        .filter_map(|s| s.labels.get("pool").map(String::as_str))
        .collect();
    assert!(pools.contains(&"heap"));
}

#[tokio::test]
async fn test_text_exposition_contains_identity() {
    let registrar = MetricsRegistrar::install(
        &telemetry_config(ExporterKind::None),
        &GeneratorConfig::default(),
        Arc::new(GeneratorStats::new()),
    )
    .unwrap();

    let text = String::from_utf8(registrar.encode_text().unwrap()).unwrap();
    assert!(text.contains("generator_batch_size"));
    assert!(text.contains("service_name=\"sawtooth-test\""));
}

#[tokio::test]
async fn test_no_exporter_means_no_reader() {
    let registrar = MetricsRegistrar::install(
        &telemetry_config(ExporterKind::None),
        &GeneratorConfig::default(),
        Arc::new(GeneratorStats::new()),
    )
    .unwrap();

    assert!(registrar.start_exporter().unwrap().is_none());
}

#[tokio::test]
async fn test_log_exporter_runs_on_its_own_interval() {
    let config = TelemetryConfig {
        export_interval_millis: 100,
        ..telemetry_config(ExporterKind::Log)
    };
    let registrar = MetricsRegistrar::install(
        &config,
        &GeneratorConfig::default(),
        Arc::new(GeneratorStats::new()),
    )
    .unwrap();

    let reader = registrar.start_exporter().unwrap().expect("log reader");
    tokio::time::sleep(Duration::from_millis(350)).await;
    let exports = reader.stop().await;

    assert!(exports.exports_ok >= 1);
    assert_eq!(exports.exports_failed, 0);
}

#[tokio::test]
async fn test_unreachable_push_endpoint_does_not_break_startup() {
    let config = TelemetryConfig {
        push_endpoint: Some("http://127.0.0.1:9".to_string()),
        export_interval_millis: 100,
        ..telemetry_config(ExporterKind::Push)
    };
    assert!(config.validate().is_ok());

    let registrar = MetricsRegistrar::install(
        &config,
        &GeneratorConfig::default(),
        Arc::new(GeneratorStats::new()),
    )
    .expect("install must not touch the network");

    let reader = registrar.start_exporter().unwrap().expect("push reader");
    tokio::time::sleep(Duration::from_millis(450)).await;
    let exports = reader.stop().await;

    assert_eq!(exports.exports_ok, 0);
    assert!(exports.exports_failed >= 1);
}
