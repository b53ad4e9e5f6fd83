use crate::config::{ExporterKind, Settings};
use crate::utils::error::{Result, SawtoothError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Optional overrides read from a TOML file. Every key may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub generator: Option<GeneratorSection>,
    pub telemetry: Option<TelemetrySection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSection {
    pub batch_size: Option<usize>,
    pub period_millis: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    pub enabled: Option<bool>,
    pub service_name: Option<String>,
    pub service_version: Option<String>,
    pub exporter: Option<ExporterKind>,
    pub export_interval_millis: Option<u64>,
    pub push_endpoint: Option<String>,
    pub push_job: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SawtoothError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${PUSHGATEWAY_URL})，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// 把檔案中有設定的欄位覆蓋到 settings 上
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(generator) = &self.generator {
            if let Some(batch_size) = generator.batch_size {
                settings.generator.batch_size = batch_size;
            }
            if let Some(period_millis) = generator.period_millis {
                settings.generator.period_millis = period_millis;
            }
        }

        if let Some(telemetry) = &self.telemetry {
            let target = &mut settings.telemetry;
            if let Some(enabled) = telemetry.enabled {
                target.enabled = enabled;
            }
            if let Some(name) = &telemetry.service_name {
                target.service_name = name.clone();
            }
            if let Some(version) = &telemetry.service_version {
                target.service_version = version.clone();
            }
            if let Some(exporter) = telemetry.exporter {
                target.exporter = exporter;
            }
            if let Some(interval) = telemetry.export_interval_millis {
                target.export_interval_millis = interval;
            }
            if let Some(endpoint) = &telemetry.push_endpoint {
                target.push_endpoint = Some(endpoint.clone());
            }
            if let Some(job) = &telemetry.push_job {
                target.push_job = Some(job.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[generator]
batch_size = 2500

[telemetry]
exporter = "none"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        let mut settings = Settings::default();
        config.apply_to(&mut settings);

        assert_eq!(settings.generator.batch_size, 2500);
        assert_eq!(settings.generator.period_millis, 500);
        assert_eq!(settings.telemetry.exporter, ExporterKind::None);
        assert_eq!(settings.telemetry.service_name, "sawtooth-memory");
    }

    #[test]
    fn test_empty_file_keeps_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        let mut settings = Settings::default();
        config.apply_to(&mut settings);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SAWTOOTH_TEST_PUSHGATEWAY", "http://pushgateway:9091");

        let toml_content = r#"
[telemetry]
exporter = "push"
push_endpoint = "${SAWTOOTH_TEST_PUSHGATEWAY}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        let mut settings = Settings::default();
        config.apply_to(&mut settings);
        assert_eq!(
            settings.telemetry.push_endpoint.as_deref(),
            Some("http://pushgateway:9091")
        );
        assert!(settings.validate().is_ok());

        std::env::remove_var("SAWTOOTH_TEST_PUSHGATEWAY");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let toml_content = r#"
[generator]
batch_sise = 10
"#;
        let err = TomlConfig::from_toml_str(toml_content).unwrap_err();
        assert!(matches!(err, SawtoothError::TomlError(_)));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[generator]
period_millis = 250

[telemetry]
service_name = "file-test"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        let mut settings = Settings::default();
        config.apply_to(&mut settings);
        assert_eq!(settings.generator.period_millis, 250);
        assert_eq!(settings.telemetry.service_name, "file-test");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TomlConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, SawtoothError::IoError(_)));
    }
}
