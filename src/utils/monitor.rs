use std::time::Duration;
#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::Instant;
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// 兩次 sysinfo 刷新的最短間隔；多個 observer 在同一次 gather 內共用同一份取樣
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(250);

/// One sample of process and host state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemSample {
    pub process_cpu_percent: f32,
    pub system_cpu_percent: f32,
    pub cpu_count: usize,
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
    pub peak_resident_bytes: u64,
    pub total_memory_bytes: u64,
    pub used_memory_bytes: u64,
    /// OS threads of this process, when the platform reports them.
    pub thread_count: Option<usize>,
    pub elapsed: Duration,
}

#[cfg(feature = "cli")]
struct MonitorState {
    system: System,
    last: Option<(Instant, SystemSample)>,
    peak_resident_bytes: u64,
}

#[cfg(feature = "cli")]
pub struct SystemMonitor {
    state: Mutex<MonitorState>,
    pid: Option<Pid>,
    start_time: Instant,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let mut system = System::new_with_specifics(RefreshKind::everything());

        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!("Cannot resolve current PID, process stats disabled: {}", e);
                None
            }
        };

        // 初始刷新，CPU 使用率需要兩次取樣才有意義
        system.refresh_all();

        Self {
            state: Mutex::new(MonitorState {
                system,
                last: None,
                peak_resident_bytes: 0,
            }),
            pid,
            start_time: Instant::now(),
            enabled,
        }
    }

    pub fn sample(&self) -> Option<SystemSample> {
        if !self.enabled {
            return None;
        }

        let mut state = self.state.lock().ok()?;
        if let Some((taken_at, sample)) = &state.last {
            if taken_at.elapsed() < MIN_REFRESH_INTERVAL {
                return Some(sample.clone());
            }
        }

        state.system.refresh_all();

        let mut sample = SystemSample {
            system_cpu_percent: state.system.global_cpu_usage(),
            cpu_count: state.system.cpus().len(),
            total_memory_bytes: state.system.total_memory(),
            used_memory_bytes: state.system.used_memory(),
            elapsed: self.start_time.elapsed(),
            ..SystemSample::default()
        };

        if let Some(process) = self.pid.and_then(|pid| state.system.process(pid)) {
            sample.process_cpu_percent = process.cpu_usage();
            sample.resident_bytes = process.memory();
            sample.virtual_bytes = process.virtual_memory();
            sample.thread_count = process.tasks().map(|tasks| tasks.len());
        }

        // 更新峰值記憶體
        if sample.resident_bytes > state.peak_resident_bytes {
            state.peak_resident_bytes = sample.resident_bytes;
        }
        sample.peak_resident_bytes = state.peak_resident_bytes;

        state.last = Some((Instant::now(), sample.clone()));
        Some(sample)
    }

    pub fn log_stats(&self, phase: &str) {
        if let Some(stats) = self.sample() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                stats.process_cpu_percent,
                stats.resident_bytes / 1024 / 1024,
                stats.peak_resident_bytes / 1024 / 1024,
                stats.elapsed
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

// 為非CLI環境提供空實現
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn sample(&self) -> Option<SystemSample> {
        None
    }

    pub fn log_stats(&self, _phase: &str) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_returns_nothing() {
        let monitor = SystemMonitor::new(false);
        assert!(!monitor.is_enabled());
        assert!(monitor.sample().is_none());
    }

    #[test]
    fn test_samples_within_refresh_interval_are_shared() {
        let monitor = SystemMonitor::new(true);
        let first = monitor.sample().expect("sample");
        let second = monitor.sample().expect("sample");
        assert_eq!(first, second);
        assert!(first.cpu_count > 0);
        assert!(first.total_memory_bytes > 0);
        assert!(first.peak_resident_bytes >= first.resident_bytes);
    }
}
