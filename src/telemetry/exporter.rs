use crate::config::{ExporterKind, TelemetryConfig};
use crate::domain::model::{MetricSample, MetricsSnapshot};
use crate::domain::ports::MetricExporter;
use crate::utils::error::{Result, SawtoothError};
use async_trait::async_trait;
use prometheus::proto::{MetricFamily, MetricType};
use prometheus::{Encoder, Registry, TextEncoder};
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use url::Url;

/// Push requests never wait longer than this, however long the export interval is.
const MAX_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

fn kind_name(kind: MetricType) -> &'static str {
    match kind {
        MetricType::COUNTER => "counter",
        MetricType::GAUGE => "gauge",
        MetricType::SUMMARY => "summary",
        MetricType::UNTYPED => "untyped",
        MetricType::HISTOGRAM => "histogram",
    }
}

/// Flattens gathered families and renders the text exposition in one go.
pub fn snapshot_of(families: &[MetricFamily]) -> Result<MetricsSnapshot> {
    let mut samples = Vec::new();
    for family in families {
        let kind = family.get_field_type();
        for metric in family.get_metric() {
            let labels: BTreeMap<String, String> = metric
                .get_label()
                .iter()
                .map(|l| (l.get_name().to_string(), l.get_value().to_string()))
                .collect();
            // histogram / summary 只取總和，log 輸出夠用
            let value = match kind {
                MetricType::COUNTER => metric.get_counter().get_value(),
                MetricType::GAUGE => metric.get_gauge().get_value(),
                MetricType::UNTYPED => metric.get_untyped().get_value(),
                MetricType::HISTOGRAM => metric.get_histogram().get_sample_sum(),
                MetricType::SUMMARY => metric.get_summary().get_sample_sum(),
            };
            samples.push(MetricSample {
                name: family.get_name().to_string(),
                kind: kind_name(kind).to_string(),
                labels,
                value,
            });
        }
    }

    let encoder = TextEncoder::new();
    let mut exposition = Vec::new();
    encoder.encode(families, &mut exposition)?;

    Ok(MetricsSnapshot {
        taken_at: chrono::Utc::now(),
        samples,
        exposition,
        content_type: encoder.format_type().to_string(),
    })
}

/// Writes every sample as one JSON log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExporter;

#[async_trait]
impl MetricExporter for LogExporter {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let taken_at = snapshot.taken_at.to_rfc3339();
        for sample in &snapshot.samples {
            let line = serde_json::to_string(sample)?;
            tracing::info!(taken_at = %taken_at, "metric {}", line);
        }
        Ok(())
    }
}

/// Pushes the text exposition to a Prometheus Pushgateway.
#[derive(Debug, Clone)]
pub struct PushExporter {
    client: Client,
    url: Url,
}

impl PushExporter {
    pub fn new(endpoint: &str, job: &str, timeout: Duration) -> Result<Self> {
        let invalid = |reason: &str| SawtoothError::InvalidConfigValueError {
            field: "telemetry.push_endpoint".to_string(),
            value: endpoint.to_string(),
            reason: reason.to_string(),
        };

        let mut url = Url::parse(endpoint).map_err(|e| invalid(&e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot be a base"))?
            .pop_if_empty()
            .extend(["metrics", "job", job]);

        // 建立 client 不會連線，端點不可達也不影響啟動
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait]
impl MetricExporter for PushExporter {
    fn name(&self) -> &'static str {
        "push"
    }

    async fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let response = self
            .client
            .put(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, snapshot.content_type.as_str())
            .body(snapshot.exposition.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SawtoothError::ExportError {
                message: format!("pushgateway returned {}: {}", status, body.trim()),
            });
        }

        tracing::debug!("Pushed {} bytes to {}", snapshot.exposition.len(), self.url);
        Ok(())
    }
}

/// Picks the exporter for the configured variant; `None` means observe only.
pub fn build_exporter(config: &TelemetryConfig) -> Result<Option<Box<dyn MetricExporter>>> {
    match config.exporter {
        ExporterKind::None => Ok(None),
        ExporterKind::Log => Ok(Some(Box::new(LogExporter))),
        ExporterKind::Push => {
            let endpoint = config.push_endpoint.as_deref().ok_or_else(|| {
                SawtoothError::MissingConfigError {
                    field: "telemetry.push_endpoint".to_string(),
                }
            })?;
            let timeout = config.export_interval().min(MAX_PUSH_TIMEOUT);
            let exporter = PushExporter::new(endpoint, config.push_job(), timeout)?;
            tracing::info!("📤 Pushing metrics to {}", exporter.url());
            Ok(Some(Box::new(exporter)))
        }
    }
}

#[derive(Debug, Default)]
pub struct ReaderStats {
    exports_ok: AtomicU64,
    exports_failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderSnapshot {
    pub exports_ok: u64,
    pub exports_failed: u64,
}

impl ReaderStats {
    pub fn snapshot(&self) -> ReaderSnapshot {
        ReaderSnapshot {
            exports_ok: self.exports_ok.load(Ordering::Relaxed),
            exports_failed: self.exports_failed.load(Ordering::Relaxed),
        }
    }
}

/// Gathers the registry on its own timer and hands the result to an exporter.
pub struct PeriodicReader {
    registry: Registry,
    exporter: Box<dyn MetricExporter>,
    interval: Duration,
}

impl PeriodicReader {
    pub fn new(registry: Registry, exporter: Box<dyn MetricExporter>, interval: Duration) -> Self {
        Self {
            registry,
            exporter,
            interval,
        }
    }

    pub async fn collect_and_export(&self) -> Result<()> {
        let snapshot = snapshot_of(&self.registry.gather())?;
        self.exporter.export(&snapshot).await
    }

    /// The first export happens one interval after start.
    pub fn spawn(self) -> ReaderHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let stats = Arc::new(ReaderStats::default());
        let task_stats = Arc::clone(&stats);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match self.collect_and_export().await {
                            Ok(()) => {
                                task_stats.exports_ok.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                // 匯出失敗只記錄，資料直接丟棄，下一輪再試
                                task_stats.exports_failed.fetch_add(1, Ordering::Relaxed);
                                tracing::warn!(
                                    exporter = self.exporter.name(),
                                    "⚠️ Metric export failed: {}",
                                    e
                                );
                            }
                        }
                    }
                }
            }
        });

        ReaderHandle {
            shutdown,
            task,
            stats,
        }
    }
}

pub struct ReaderHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    stats: Arc<ReaderStats>,
}

impl ReaderHandle {
    pub fn stats(&self) -> ReaderSnapshot {
        self.stats.snapshot()
    }

    pub async fn stop(self) -> ReaderSnapshot {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("Metric reader task ended abnormally: {}", e);
        }
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{IntGauge, Opts};

    fn registry_with_gauge(value: i64) -> Registry {
        let registry = Registry::new();
        let gauge = IntGauge::with_opts(Opts::new("demo_gauge", "demo")).unwrap();
        gauge.set(value);
        registry.register(Box::new(gauge)).unwrap();
        registry
    }

    #[test]
    fn test_snapshot_flattens_samples_and_text() {
        let registry = registry_with_gauge(7);
        let snapshot = snapshot_of(&registry.gather()).unwrap();

        let sample = snapshot.find("demo_gauge").next().unwrap();
        assert_eq!(sample.kind, "gauge");
        assert_eq!(sample.value, 7.0);
        let text = String::from_utf8(snapshot.exposition.clone()).unwrap();
        assert!(text.contains("demo_gauge 7"));
        assert!(snapshot.content_type.starts_with("text/plain"));
    }

    #[test]
    fn test_push_url_is_built_from_endpoint_and_job() {
        let exporter =
            PushExporter::new("http://localhost:9091/", "sawtooth", Duration::from_secs(1)).unwrap();
        assert_eq!(exporter.url(), "http://localhost:9091/metrics/job/sawtooth");

        let exporter =
            PushExporter::new("http://gw:9091/base", "my job", Duration::from_secs(1)).unwrap();
        assert_eq!(exporter.url(), "http://gw:9091/base/metrics/job/my%20job");
    }

    #[test]
    fn test_build_exporter_variants() {
        let mut config = TelemetryConfig {
            exporter: ExporterKind::None,
            ..TelemetryConfig::default()
        };
        assert!(build_exporter(&config).unwrap().is_none());

        config.exporter = ExporterKind::Log;
        assert_eq!(build_exporter(&config).unwrap().unwrap().name(), "log");

        config.exporter = ExporterKind::Push;
        assert!(build_exporter(&config).is_err());
    }

    #[test]
    fn test_log_exporter_accepts_snapshot() {
        let registry = registry_with_gauge(1);
        let reader = PeriodicReader::new(registry, Box::new(LogExporter), Duration::from_secs(1));
        tokio_test::assert_ok!(tokio_test::block_on(reader.collect_and_export()));
    }
}
