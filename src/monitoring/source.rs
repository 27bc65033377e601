/*!
 * Platform Metric Sources
 *
 * Raw CPU/memory collection behind one capability interface, with a
 * per-platform implementation selected at startup. Collection failures
 * degrade to `None`; the monitor turns that into zero metrics rather than
 * propagating the error.
 */

use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Capability interface for raw host metrics
pub trait MetricsSource: Send + Sync {
    /// Total CPU time consumed by this process so far
    fn process_cpu_time(&self) -> Option<Duration>;

    /// Resident set size, in bytes
    fn resident_memory(&self) -> Option<u64>;

    /// Total physical memory, in bytes
    fn total_memory(&self) -> Option<u64>;

    /// Logical core count
    fn core_count(&self) -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Select the best source for the current platform
#[must_use]
pub fn platform_source() -> Box<dyn MetricsSource> {
    #[cfg(target_os = "linux")]
    {
        Box::new(ProcSource::new())
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(NullSource::new())
    }
}

/// Linux source reading the proc filesystem
///
/// CPU time comes from `/proc/self/stat` (utime + stime), memory from
/// `/proc/self/status` (VmRSS) and `/proc/meminfo` (MemTotal).
#[cfg(target_os = "linux")]
pub struct ProcSource;

#[cfg(target_os = "linux")]
impl ProcSource {
    /// Proc reports CPU time in USER_HZ ticks; the kernel fixes the exposed
    /// value at 100 regardless of its internal HZ
    const TICKS_PER_SEC: u64 = 100;

    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn read_stat_ticks() -> Option<u64> {
        let stat = std::fs::read_to_string("/proc/self/stat").ok()?;
        // The comm field may contain spaces; everything positional starts
        // after the closing paren
        let rest = stat.rsplit_once(')')?.1;
        let fields: Vec<&str> = rest.split_whitespace().collect();
        // utime and stime are stat fields 14 and 15; `rest` starts at field 3
        let utime: u64 = fields.get(11)?.parse().ok()?;
        let stime: u64 = fields.get(12)?.parse().ok()?;
        Some(utime + stime)
    }

    fn read_kb_field(path: &str, key: &str) -> Option<u64> {
        let content = std::fs::read_to_string(path).ok()?;
        for line in content.lines() {
            if let Some(rest) = line.strip_prefix(key) {
                let kb: u64 = rest
                    .trim()
                    .trim_end_matches("kB")
                    .trim()
                    .parse()
                    .ok()?;
                return Some(kb * 1024);
            }
        }
        None
    }
}

#[cfg(target_os = "linux")]
impl Default for ProcSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
impl MetricsSource for ProcSource {
    fn process_cpu_time(&self) -> Option<Duration> {
        let ticks = Self::read_stat_ticks()?;
        Some(Duration::from_millis(ticks * 1000 / Self::TICKS_PER_SEC))
    }

    fn resident_memory(&self) -> Option<u64> {
        Self::read_kb_field("/proc/self/status", "VmRSS:")
    }

    fn total_memory(&self) -> Option<u64> {
        Self::read_kb_field("/proc/meminfo", "MemTotal:")
    }
}

/// Degraded fallback for platforms without a native source
///
/// Reports nothing; the monitor resolves every metric to zero.
pub struct NullSource;

impl NullSource {
    #[must_use]
    pub fn new() -> Self {
        warn!("No native metrics source for this platform; resource metrics degraded to zero");
        Self
    }
}

impl Default for NullSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for NullSource {
    fn process_cpu_time(&self) -> Option<Duration> {
        None
    }

    fn resident_memory(&self) -> Option<u64> {
        None
    }

    fn total_memory(&self) -> Option<u64> {
        None
    }
}

/// Scripted source for tests and diagnostics
///
/// Clones share state, so a test can keep one handle and feed the monitor
/// through another.
pub struct SyntheticSource {
    cpu_time_micros: Arc<AtomicU64>,
    resident: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
    cores: usize,
}

impl SyntheticSource {
    #[must_use]
    pub fn new(cores: usize) -> Self {
        Self {
            cpu_time_micros: Arc::new(AtomicU64::new(0)),
            resident: Arc::new(AtomicU64::new(0)),
            total: Arc::new(AtomicU64::new(0)),
            cores,
        }
    }

    /// Advance the scripted process CPU clock
    pub fn advance_cpu(&self, by: Duration) {
        self.cpu_time_micros
            .fetch_add(by.as_micros() as u64, Ordering::Relaxed);
    }

    /// Set scripted memory figures, in bytes
    pub fn set_memory(&self, resident: u64, total: u64) {
        self.resident.store(resident, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }
}

impl Clone for SyntheticSource {
    fn clone(&self) -> Self {
        Self {
            cpu_time_micros: Arc::clone(&self.cpu_time_micros),
            resident: Arc::clone(&self.resident),
            total: Arc::clone(&self.total),
            cores: self.cores,
        }
    }
}

impl MetricsSource for SyntheticSource {
    fn process_cpu_time(&self) -> Option<Duration> {
        Some(Duration::from_micros(
            self.cpu_time_micros.load(Ordering::Relaxed),
        ))
    }

    fn resident_memory(&self) -> Option<u64> {
        Some(self.resident.load(Ordering::Relaxed))
    }

    fn total_memory(&self) -> Option<u64> {
        Some(self.total.load(Ordering::Relaxed))
    }

    fn core_count(&self) -> usize {
        self.cores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_source_scripts_metrics() {
        let source = SyntheticSource::new(4);
        source.advance_cpu(Duration::from_secs(2));
        source.set_memory(512, 1024);

        assert_eq!(source.process_cpu_time(), Some(Duration::from_secs(2)));
        assert_eq!(source.resident_memory(), Some(512));
        assert_eq!(source.total_memory(), Some(1024));
        assert_eq!(source.core_count(), 4);
    }

    #[test]
    fn test_synthetic_clones_share_state() {
        let source = SyntheticSource::new(1);
        let feeder = source.clone();
        feeder.advance_cpu(Duration::from_secs(1));
        assert_eq!(source.process_cpu_time(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_null_source_reports_nothing() {
        let source = NullSource;
        assert!(source.process_cpu_time().is_none());
        assert!(source.resident_memory().is_none());
        assert!(source.total_memory().is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_proc_source_reads_live_process() {
        let source = ProcSource::new();
        // This process exists, so proc must yield something sane
        assert!(source.process_cpu_time().is_some());
        let resident = source.resident_memory().unwrap();
        let total = source.total_memory().unwrap();
        assert!(resident > 0);
        assert!(total >= resident);
    }
}
