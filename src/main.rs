use anyhow::Context;
use clap::Parser;
use sawtooth_memory::telemetry::alloc::CountingAllocator;
use sawtooth_memory::utils::{logger, monitor::SystemMonitor, validation::Validate};
use sawtooth_memory::{spawn_generator, CliConfig, GeneratorStats, MetricsRegistrar, SawtoothError};
use std::sync::Arc;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

fn exit_with(e: &SawtoothError) -> ! {
    tracing::error!(
        "❌ Startup failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    std::process::exit(e.exit_code().max(1));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let settings = cli.resolve().unwrap_or_else(|e| exit_with(&e));
    if let Err(e) = settings.validate() {
        exit_with(&e);
    }
    tracing::debug!("Resolved settings: {:?}", settings);

    tracing::info!("Let's simulate some fictional data processing...");

    let stats = Arc::new(GeneratorStats::new());

    // 先裝好 metrics，再開始產生資料
    let registrar = if settings.telemetry.enabled {
        let registrar =
            MetricsRegistrar::install(&settings.telemetry, &settings.generator, Arc::clone(&stats))
                .unwrap_or_else(|e| exit_with(&e));
        Some(registrar)
    } else {
        tracing::info!("Telemetry disabled");
        None
    };
    let reader = match &registrar {
        Some(registrar) => registrar.start_exporter().unwrap_or_else(|e| exit_with(&e)),
        None => None,
    };

    let generator = spawn_generator(settings.generator, Arc::clone(&stats));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested");

    let final_stats = generator.stop().await;
    if let Some(reader) = reader {
        let exports = reader.stop().await;
        tracing::info!(
            "📤 Exports: {} ok, {} failed",
            exports.exports_ok,
            exports.exports_failed
        );
    }

    match &registrar {
        Some(registrar) => registrar.monitor().log_stats("Final Stats"),
        None => SystemMonitor::new(true).log_stats("Final Stats"),
    }
    tracing::info!(
        "✅ {} cycles, {} records created, peak {} live",
        final_stats.cycles,
        final_stats.records_created,
        final_stats.records_live_peak
    );

    Ok(())
}
