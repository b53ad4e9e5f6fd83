use thiserror::Error;

#[derive(Error, Debug)]
pub enum SawtoothError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Metrics registry error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("HTTP export request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Metric export failed: {message}")]
    ExportError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Telemetry,
    Export,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SawtoothError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SawtoothError::TomlError(_)
            | SawtoothError::InvalidConfigValueError { .. }
            | SawtoothError::MissingConfigError { .. } => ErrorCategory::Configuration,
            SawtoothError::MetricsError(_) => ErrorCategory::Telemetry,
            SawtoothError::HttpError(_)
            | SawtoothError::SerializationError(_)
            | SawtoothError::ExportError { .. } => ErrorCategory::Export,
            SawtoothError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 匯出失敗由 reader 吞掉，只記錄警告
            ErrorCategory::Export => ErrorSeverity::Low,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Telemetry => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            SawtoothError::IoError(_) => {
                "Check that the config file exists and is readable".to_string()
            }
            SawtoothError::TomlError(_) => {
                "Check the TOML syntax of the config file".to_string()
            }
            SawtoothError::MetricsError(_) => {
                "Metric names must be unique; check for duplicate observer registration"
                    .to_string()
            }
            SawtoothError::SerializationError(_) => {
                "Metric samples could not be rendered as JSON; switch to the push exporter"
                    .to_string()
            }
            SawtoothError::HttpError(_) | SawtoothError::ExportError { .. } => {
                "Check that the push endpoint is reachable; exports are retried on the next interval"
                    .to_string()
            }
            SawtoothError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' and restart", field)
            }
            SawtoothError::MissingConfigError { field } => {
                format!("Provide '{}' via CLI flag, environment or config file", field)
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Telemetry => format!("Could not set up metrics: {}", self),
            ErrorCategory::Export => format!("Could not export metrics: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// 依嚴重程度決定行程結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, SawtoothError>;
