pub mod alloc;
pub mod exporter;
pub mod observers;

use crate::config::{GeneratorConfig, TelemetryConfig};
use crate::core::generator::GeneratorStats;
use crate::domain::model::MetricsSnapshot;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use exporter::{build_exporter, snapshot_of, PeriodicReader, ReaderHandle};
use observers::{AllocatorObserver, CpuObserver, GeneratorObserver, MemoryObserver, ThreadObserver};
use prometheus::{Encoder, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;

/// One telemetry pipeline: a registry stamped with the service identity and
/// the fixed set of runtime observers.
///
/// Nothing is registered globally; hand the registrar (or a clone of its
/// registry) to whatever needs to read metrics.
pub struct MetricsRegistrar {
    registry: Registry,
    config: TelemetryConfig,
    monitor: Arc<SystemMonitor>,
}

impl MetricsRegistrar {
    /// Builds the registry and attaches every observer. Does no I/O beyond
    /// reading process stats, so an unreachable export endpoint cannot fail it.
    pub fn install(
        config: &TelemetryConfig,
        generator: &GeneratorConfig,
        stats: Arc<GeneratorStats>,
    ) -> Result<Self> {
        let mut labels = HashMap::new();
        labels.insert("service_name".to_string(), config.service_name.clone());
        labels.insert("service_version".to_string(), config.service_version.clone());
        let registry = Registry::new_custom(None, Some(labels))?;

        let monitor = Arc::new(SystemMonitor::new(true));

        registry.register(Box::new(CpuObserver::new(Arc::clone(&monitor))?))?;
        registry.register(Box::new(MemoryObserver::new(Arc::clone(&monitor))?))?;
        registry.register(Box::new(ThreadObserver::new(Arc::clone(&monitor))?))?;
        registry.register(Box::new(AllocatorObserver::new()?))?;
        registry.register(Box::new(GeneratorObserver::new(generator, stats)?))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        tracing::info!(
            service_name = %config.service_name,
            service_version = %config.service_version,
            exporter = %config.exporter,
            "📈 Metrics registrar installed"
        );

        Ok(Self {
            registry,
            config: config.clone(),
            monitor,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn monitor(&self) -> &Arc<SystemMonitor> {
        &self.monitor
    }

    pub fn snapshot(&self) -> Result<MetricsSnapshot> {
        snapshot_of(&self.registry.gather())
    }

    pub fn encode_text(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(buf)
    }

    /// Spawns the periodic reader for the configured exporter, if any.
    pub fn start_exporter(&self) -> Result<Option<ReaderHandle>> {
        let Some(exporter) = build_exporter(&self.config)? else {
            tracing::info!("No metric exporter configured, observers only");
            return Ok(None);
        };

        tracing::info!(
            exporter = exporter.name(),
            interval_ms = self.config.export_interval_millis,
            "Starting periodic metric reader"
        );
        let reader = PeriodicReader::new(
            self.registry.clone(),
            exporter,
            self.config.export_interval(),
        );
        Ok(Some(reader.spawn()))
    }
}
