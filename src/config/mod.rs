#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_PERIOD_MILLIS: u64 = 500;
pub const DEFAULT_SERVICE_NAME: &str = "sawtooth-memory";
pub const DEFAULT_SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_EXPORT_INTERVAL_MILLIS: u64 = 60_000;

/// 上限只是防止手誤（例如多打幾個 0）把機器記憶體吃光
pub const MAX_BATCH_SIZE: usize = 10_000_000;
pub const MAX_PERIOD_MILLIS: u64 = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub batch_size: usize,
    pub period_millis: u64,
}

impl GeneratorConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_millis.max(1))
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            period_millis: DEFAULT_PERIOD_MILLIS,
        }
    }
}

/// Where gathered metrics go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    /// Observers are registered but nothing is exported.
    None,
    /// A periodic log line per metric.
    #[default]
    Log,
    /// Push the text exposition to a Prometheus Pushgateway.
    Push,
}

impl std::fmt::Display for ExporterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExporterKind::None => f.write_str("none"),
            ExporterKind::Log => f.write_str("log"),
            ExporterKind::Push => f.write_str("push"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// When false the metrics registrar is never installed.
    pub enabled: bool,
    pub service_name: String,
    pub service_version: String,
    pub exporter: ExporterKind,
    pub export_interval_millis: u64,
    pub push_endpoint: Option<String>,
    pub push_job: Option<String>,
}

impl TelemetryConfig {
    pub fn export_interval(&self) -> Duration {
        Duration::from_millis(self.export_interval_millis.max(1))
    }

    /// Pushgateway job name, the service name unless set explicitly.
    pub fn push_job(&self) -> &str {
        self.push_job.as_deref().unwrap_or(&self.service_name)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: DEFAULT_SERVICE_VERSION.to_string(),
            exporter: ExporterKind::default(),
            export_interval_millis: DEFAULT_EXPORT_INTERVAL_MILLIS,
            push_endpoint: None,
            push_job: None,
        }
    }
}

/// Fully resolved process settings. Fixed once the generator starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub generator: GeneratorConfig,
    pub telemetry: TelemetryConfig,
}

impl Validate for GeneratorConfig {
    fn validate(&self) -> Result<()> {
        validate_range("generator.batch_size", self.batch_size, 0, MAX_BATCH_SIZE)?;
        validate_range("generator.period_millis", self.period_millis, 1, MAX_PERIOD_MILLIS)?;
        Ok(())
    }
}

impl Validate for TelemetryConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("telemetry.service_name", &self.service_name)?;
        validate_non_empty_string("telemetry.service_version", &self.service_version)?;
        validate_range(
            "telemetry.export_interval_millis",
            self.export_interval_millis,
            100,
            MAX_PERIOD_MILLIS,
        )?;

        if let Some(job) = &self.push_job {
            validate_non_empty_string("telemetry.push_job", job)?;
        }

        if self.exporter == ExporterKind::Push {
            let endpoint = validate_required_field("telemetry.push_endpoint", &self.push_endpoint)?;
            validate_url("telemetry.push_endpoint", endpoint)?;
        }

        Ok(())
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        self.generator.validate()?;
        // 停用遙測時不檢查其餘欄位
        if self.telemetry.enabled {
            self.telemetry.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::SawtoothError;

    #[test]
    fn test_defaults_match_the_demo_constants() {
        let settings = Settings::default();
        assert_eq!(settings.generator.batch_size, 10_000);
        assert_eq!(settings.generator.period(), Duration::from_millis(500));
        assert_eq!(settings.telemetry.service_name, "sawtooth-memory");
        assert_eq!(settings.telemetry.exporter, ExporterKind::Log);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_is_valid_but_zero_period_is_not() {
        let mut generator = GeneratorConfig {
            batch_size: 0,
            period_millis: 500,
        };
        assert!(generator.validate().is_ok());

        generator.period_millis = 0;
        assert!(generator.validate().is_err());
    }

    #[test]
    fn test_push_exporter_requires_endpoint() {
        let mut telemetry = TelemetryConfig {
            exporter: ExporterKind::Push,
            ..TelemetryConfig::default()
        };
        let err = telemetry.validate().unwrap_err();
        assert!(matches!(err, SawtoothError::MissingConfigError { .. }));

        telemetry.push_endpoint = Some("localhost:9091".to_string());
        assert!(telemetry.validate().is_err());

        telemetry.push_endpoint = Some("http://localhost:9091".to_string());
        assert!(telemetry.validate().is_ok());
        assert_eq!(telemetry.push_job(), "sawtooth-memory");
    }

    #[test]
    fn test_disabled_telemetry_skips_validation() {
        let settings = Settings {
            telemetry: TelemetryConfig {
                enabled: false,
                service_name: String::new(),
                ..TelemetryConfig::default()
            },
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
    }
}
