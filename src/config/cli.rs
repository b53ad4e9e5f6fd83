use crate::config::toml_config::TomlConfig;
use crate::config::{ExporterKind, Settings};
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

/// Command line flags. Every flag is optional: with none given the process
/// runs the 10 000 records / 500 ms demo and logs its metrics.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "sawtooth-memory")]
#[command(about = "Allocates and discards batches of placeholder records to draw a sawtooth memory graph")]
pub struct CliConfig {
    /// TOML file with [generator] / [telemetry] overrides
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Placeholder records allocated per cycle
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Milliseconds between cycle starts
    #[arg(long)]
    pub period_millis: Option<u64>,

    /// Do not install the metrics registrar at all
    #[arg(long)]
    pub no_telemetry: bool,

    #[arg(long, value_enum)]
    pub exporter: Option<ExporterKind>,

    #[arg(long, env = "SAWTOOTH_PUSH_ENDPOINT")]
    pub push_endpoint: Option<String>,

    #[arg(long)]
    pub push_job: Option<String>,

    #[arg(long, env = "SAWTOOTH_EXPORT_INTERVAL_MILLIS")]
    pub export_interval_millis: Option<u64>,

    #[arg(long)]
    pub service_name: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub json_logs: bool,
}

impl CliConfig {
    /// 優先順序：內建預設值 < 設定檔 < 命令列參數
    pub fn resolve(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(path) = &self.config {
            tracing::debug!("Loading config file: {}", path.display());
            TomlConfig::from_file(path)?.apply_to(&mut settings);
        }

        if let Some(batch_size) = self.batch_size {
            settings.generator.batch_size = batch_size;
        }
        if let Some(period_millis) = self.period_millis {
            settings.generator.period_millis = period_millis;
        }

        let telemetry = &mut settings.telemetry;
        if self.no_telemetry {
            telemetry.enabled = false;
        }
        if let Some(exporter) = self.exporter {
            telemetry.exporter = exporter;
        }
        if let Some(endpoint) = &self.push_endpoint {
            telemetry.push_endpoint = Some(endpoint.clone());
        }
        if let Some(job) = &self.push_job {
            telemetry.push_job = Some(job.clone());
        }
        if let Some(interval) = self.export_interval_millis {
            telemetry.export_interval_millis = interval;
        }
        if let Some(name) = &self.service_name {
            telemetry.service_name = name.clone();
        }

        Ok(settings)
    }
}
