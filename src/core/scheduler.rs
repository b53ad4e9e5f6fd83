use crate::config::GeneratorConfig;
use crate::core::generator::{generate_and_discard, CycleReport, GeneratorStats, StatsSnapshot};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Handle to the running generator task.
///
/// Dropping the handle also stops the task, since the shutdown channel closes.
pub struct GeneratorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    stats: Arc<GeneratorStats>,
}

impl GeneratorHandle {
    pub fn stats(&self) -> &Arc<GeneratorStats> {
        &self.stats
    }

    /// Stops the schedule after the current cycle (if any) and returns the final counters.
    pub async fn stop(self) -> StatsSnapshot {
        // 接收端已結束時 send 會失敗，可以忽略
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("Generator task ended abnormally: {}", e);
        }
        self.stats.snapshot()
    }
}

/// Starts the periodic batch generator with debug logging per cycle.
pub fn spawn_generator(config: GeneratorConfig, stats: Arc<GeneratorStats>) -> GeneratorHandle {
    spawn_generator_with(config, stats, |report| {
        tracing::debug!(
            records = report.records,
            elapsed_us = report.elapsed.as_micros() as u64,
            "Generated and discarded batch"
        );
    })
}

/// Starts the generator on a single task and calls `on_cycle` after every completed cycle.
///
/// Cycle `k` is due at `start + k * period`. The first cycle runs at once.
/// A cycle that overruns its period delays the next one, which then starts
/// immediately; ticks missed meanwhile are skipped rather than replayed, so
/// the schedule never bursts and cycles never overlap.
pub fn spawn_generator_with<F>(
    config: GeneratorConfig,
    stats: Arc<GeneratorStats>,
    mut on_cycle: F,
) -> GeneratorHandle
where
    F: FnMut(CycleReport) + Send + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let task_stats = Arc::clone(&stats);

    tracing::info!(
        batch_size = config.batch_size,
        period_ms = config.period_millis,
        "🚀 Starting periodic batch generator"
    );

    let task = tokio::spawn(async move {
        let mut ticker = interval(config.period());
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
                    if let Some(report) = generate_and_discard(config.batch_size, &task_stats) {
                        on_cycle(report);
                    }
                }
            }
        }

        tracing::info!(cycles = task_stats.cycles(), "🛑 Batch generator stopped");
    });

    GeneratorHandle {
        shutdown,
        task,
        stats,
    }
}
