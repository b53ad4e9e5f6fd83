//! Passive runtime observers.
//!
//! Each observer owns a handful of ordinary prometheus metrics and refreshes
//! them inside [`Collector::collect`], so sampling happens whenever the
//! registry is gathered and never on the generator's schedule.

use crate::config::GeneratorConfig;
use crate::core::generator::GeneratorStats;
use crate::telemetry::alloc::heap_stats;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, IntCounter, IntGauge, Opts};
use std::sync::Arc;

fn describe<'a>(collectors: &[&'a dyn Collector]) -> Vec<&'a Desc> {
    collectors.iter().copied().flat_map(|c| c.desc()).collect()
}

fn collect_all(collectors: &[&dyn Collector]) -> Vec<MetricFamily> {
    collectors.iter().flat_map(|c| c.collect()).collect()
}

fn to_i64<T: TryInto<i64>>(value: T) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}

/// Counters only go up; move them to an externally tracked total.
fn sync_counter(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

/// CPU usage of this process and of the host.
pub struct CpuObserver {
    monitor: Arc<SystemMonitor>,
    process_usage: Gauge,
    system_usage: Gauge,
    cpu_count: IntGauge,
}

impl CpuObserver {
    pub fn new(monitor: Arc<SystemMonitor>) -> Result<Self> {
        Ok(Self {
            monitor,
            process_usage: Gauge::with_opts(Opts::new(
                "cpu_process_usage_percent",
                "CPU usage of this process, 100 per fully used core",
            ))?,
            system_usage: Gauge::with_opts(Opts::new(
                "cpu_system_usage_percent",
                "CPU usage of the whole host",
            ))?,
            cpu_count: IntGauge::with_opts(Opts::new("cpu_count", "Logical CPUs on the host"))?,
        })
    }

    fn parts(&self) -> [&dyn Collector; 3] {
        [&self.process_usage, &self.system_usage, &self.cpu_count]
    }
}

impl Collector for CpuObserver {
    fn desc(&self) -> Vec<&Desc> {
        describe(&self.parts())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        if let Some(sample) = self.monitor.sample() {
            self.process_usage.set(f64::from(sample.process_cpu_percent));
            self.system_usage.set(f64::from(sample.system_cpu_percent));
            self.cpu_count.set(to_i64(sample.cpu_count));
        }
        collect_all(&self.parts())
    }
}

/// Memory occupancy by pool: the process' resident and virtual size, plus host totals.
pub struct MemoryObserver {
    monitor: Arc<SystemMonitor>,
    pool_usage: GaugeVec,
    pool_peak: GaugeVec,
    system_memory: GaugeVec,
}

impl MemoryObserver {
    pub fn new(monitor: Arc<SystemMonitor>) -> Result<Self> {
        Ok(Self {
            monitor,
            pool_usage: GaugeVec::new(
                Opts::new("memory_pool_usage_bytes", "Current size of a process memory pool"),
                &["pool"],
            )?,
            pool_peak: GaugeVec::new(
                Opts::new("memory_pool_peak_bytes", "Largest observed size of a process memory pool"),
                &["pool"],
            )?,
            system_memory: GaugeVec::new(
                Opts::new("memory_system_bytes", "Host memory"),
                &["kind"],
            )?,
        })
    }

    fn parts(&self) -> [&dyn Collector; 3] {
        [&self.pool_usage, &self.pool_peak, &self.system_memory]
    }
}

impl Collector for MemoryObserver {
    fn desc(&self) -> Vec<&Desc> {
        describe(&self.parts())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        if let Some(sample) = self.monitor.sample() {
            self.pool_usage
                .with_label_values(&["resident"])
                .set(sample.resident_bytes as f64);
            self.pool_usage
                .with_label_values(&["virtual"])
                .set(sample.virtual_bytes as f64);
            self.pool_peak
                .with_label_values(&["resident"])
                .set(sample.peak_resident_bytes as f64);
            self.system_memory
                .with_label_values(&["total"])
                .set(sample.total_memory_bytes as f64);
            self.system_memory
                .with_label_values(&["used"])
                .set(sample.used_memory_bytes as f64);
        }

        // heap 來自 CountingAllocator，未安裝時為 0
        let heap = heap_stats();
        self.pool_usage
            .with_label_values(&["heap"])
            .set(heap.live_bytes as f64);

        collect_all(&self.parts())
    }
}

/// OS threads of the process and the tokio runtime's workers and tasks.
pub struct ThreadObserver {
    monitor: Arc<SystemMonitor>,
    os_threads: IntGauge,
    runtime_workers: IntGauge,
    runtime_alive_tasks: IntGauge,
}

impl ThreadObserver {
    pub fn new(monitor: Arc<SystemMonitor>) -> Result<Self> {
        Ok(Self {
            monitor,
            os_threads: IntGauge::with_opts(Opts::new(
                "thread_os_count",
                "OS threads owned by this process",
            ))?,
            runtime_workers: IntGauge::with_opts(Opts::new(
                "thread_runtime_workers",
                "Worker threads of the tokio runtime",
            ))?,
            runtime_alive_tasks: IntGauge::with_opts(Opts::new(
                "thread_runtime_alive_tasks",
                "Tasks currently alive on the tokio runtime",
            ))?,
        })
    }

    fn parts(&self) -> [&dyn Collector; 3] {
        [&self.os_threads, &self.runtime_workers, &self.runtime_alive_tasks]
    }
}

impl Collector for ThreadObserver {
    fn desc(&self) -> Vec<&Desc> {
        describe(&self.parts())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        if let Some(threads) = self.monitor.sample().and_then(|s| s.thread_count) {
            self.os_threads.set(to_i64(threads));
        }

        // gather 可能在 runtime 之外被呼叫
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let metrics = handle.metrics();
            self.runtime_workers.set(to_i64(metrics.num_workers()));
            self.runtime_alive_tasks.set(to_i64(metrics.num_alive_tasks()));
        }

        collect_all(&self.parts())
    }
}

/// Allocation and reclamation activity from the counting allocator.
pub struct AllocatorObserver {
    live_bytes: IntGauge,
    allocations: IntCounter,
    deallocations: IntCounter,
    reclaimed_bytes: IntCounter,
}

impl AllocatorObserver {
    pub fn new() -> Result<Self> {
        Ok(Self {
            live_bytes: IntGauge::with_opts(Opts::new(
                "heap_live_bytes",
                "Bytes currently allocated through the global allocator",
            ))?,
            allocations: IntCounter::with_opts(Opts::new(
                "heap_allocations_total",
                "Allocations made through the global allocator",
            ))?,
            deallocations: IntCounter::with_opts(Opts::new(
                "heap_deallocations_total",
                "Deallocations made through the global allocator",
            ))?,
            reclaimed_bytes: IntCounter::with_opts(Opts::new(
                "heap_reclaimed_bytes_total",
                "Bytes returned to the global allocator",
            ))?,
        })
    }

    fn parts(&self) -> [&dyn Collector; 4] {
        [
            &self.live_bytes,
            &self.allocations,
            &self.deallocations,
            &self.reclaimed_bytes,
        ]
    }
}

impl Collector for AllocatorObserver {
    fn desc(&self) -> Vec<&Desc> {
        describe(&self.parts())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let heap = heap_stats();
        self.live_bytes.set(to_i64(heap.live_bytes));
        sync_counter(&self.allocations, heap.allocations);
        sync_counter(&self.deallocations, heap.deallocations);
        sync_counter(&self.reclaimed_bytes, heap.reclaimed_bytes);
        collect_all(&self.parts())
    }
}

/// Configured batch size and period, and the generator's own counters.
pub struct GeneratorObserver {
    stats: Arc<GeneratorStats>,
    batch_size: IntGauge,
    period_seconds: Gauge,
    records_live: IntGauge,
    records_live_peak: IntGauge,
    last_cycle_seconds: Gauge,
    cycles: IntCounter,
    records_created: IntCounter,
    overlaps_rejected: IntCounter,
}

impl GeneratorObserver {
    pub fn new(config: &GeneratorConfig, stats: Arc<GeneratorStats>) -> Result<Self> {
        let observer = Self {
            stats,
            batch_size: IntGauge::with_opts(Opts::new(
                "generator_batch_size",
                "Placeholder records allocated per cycle",
            ))?,
            period_seconds: Gauge::with_opts(Opts::new(
                "generator_period_seconds",
                "Target time between cycle starts",
            ))?,
            records_live: IntGauge::with_opts(Opts::new(
                "generator_records_live",
                "Placeholder records alive right now",
            ))?,
            records_live_peak: IntGauge::with_opts(Opts::new(
                "generator_records_live_peak",
                "Most placeholder records ever alive at once",
            ))?,
            last_cycle_seconds: Gauge::with_opts(Opts::new(
                "generator_last_cycle_seconds",
                "Duration of the most recent cycle",
            ))?,
            cycles: IntCounter::with_opts(Opts::new(
                "generator_cycles_total",
                "Completed generation cycles",
            ))?,
            records_created: IntCounter::with_opts(Opts::new(
                "generator_records_created_total",
                "Placeholder records created",
            ))?,
            overlaps_rejected: IntCounter::with_opts(Opts::new(
                "generator_overlaps_rejected_total",
                "Cycles skipped because the previous one was still running",
            ))?,
        };

        // 設定在啟動後不會改變，只需設定一次
        observer.batch_size.set(to_i64(config.batch_size));
        observer.period_seconds.set(config.period().as_secs_f64());
        Ok(observer)
    }

    fn parts(&self) -> [&dyn Collector; 8] {
        [
            &self.batch_size,
            &self.period_seconds,
            &self.records_live,
            &self.records_live_peak,
            &self.last_cycle_seconds,
            &self.cycles,
            &self.records_created,
            &self.overlaps_rejected,
        ]
    }
}

impl Collector for GeneratorObserver {
    fn desc(&self) -> Vec<&Desc> {
        describe(&self.parts())
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let snapshot = self.stats.snapshot();
        self.records_live.set(to_i64(snapshot.records_live));
        self.records_live_peak.set(to_i64(snapshot.records_live_peak));
        self.last_cycle_seconds.set(snapshot.last_cycle.as_secs_f64());
        sync_counter(&self.cycles, snapshot.cycles);
        sync_counter(&self.records_created, snapshot.records_created);
        sync_counter(&self.overlaps_rejected, snapshot.overlaps_rejected);
        collect_all(&self.parts())
    }
}
