pub mod config;
pub mod core;
pub mod domain;
pub mod telemetry;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::{ExporterKind, GeneratorConfig, Settings, TelemetryConfig};
pub use crate::core::{generate_and_discard, spawn_generator, GeneratorHandle, GeneratorStats};
pub use telemetry::MetricsRegistrar;
pub use utils::error::{Result, SawtoothError};
