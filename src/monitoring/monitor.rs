/*!
 * Resource Monitor
 *
 * Samples host CPU/memory on a fixed cadence, smooths CPU noise with
 * 5/30/60-sample moving averages, classifies load into a pressure level,
 * and exposes the spawn-rate multiplier consumed by the admission layer.
 *
 * # Concurrency
 *
 * The composite snapshot is replaced wholesale on each sample via an
 * RCU-style pointer swap; readers on other threads never block the tick
 * thread and never observe a partial update.
 */

use crate::core::config::MonitorConfig;
use crate::core::limits::{CPU_WINDOW_LONG, CPU_WINDOW_MID, CPU_WINDOW_SHORT};
use crate::monitoring::source::MetricsSource;
use crate::monitoring::types::{PressureLevel, ResourceMetrics};
use arc_swap::ArcSwap;
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sampler state behind the tick-side lock
struct SamplerState {
    /// Tick time accumulated toward the next sample
    pending: Duration,
    last_cpu_time: Option<Duration>,
    last_sample_at: Option<Instant>,
    win_short: VecDeque<f64>,
    win_mid: VecDeque<f64>,
    win_long: VecDeque<f64>,
    last_pressure: PressureLevel,
}

/// Host load monitor feeding the admission throttle
pub struct ResourceMonitor {
    config: MonitorConfig,
    source: Box<dyn MetricsSource>,
    snapshot: ArcSwap<ResourceMetrics>,
    sampler: Mutex<SamplerState>,
    started_at: Instant,
}

impl ResourceMonitor {
    #[must_use]
    pub fn new(config: MonitorConfig, source: Box<dyn MetricsSource>) -> Self {
        Self {
            config,
            source,
            snapshot: ArcSwap::from_pointee(ResourceMetrics::empty()),
            sampler: Mutex::new(SamplerState {
                pending: Duration::ZERO,
                last_cpu_time: None,
                last_sample_at: None,
                win_short: VecDeque::with_capacity(CPU_WINDOW_SHORT),
                win_mid: VecDeque::with_capacity(CPU_WINDOW_MID),
                win_long: VecDeque::with_capacity(CPU_WINDOW_LONG),
                last_pressure: PressureLevel::Normal,
            }),
            started_at: Instant::now(),
        }
    }

    /// Monitor backed by the platform's native metric source
    #[must_use]
    pub fn with_platform_source(config: MonitorConfig) -> Self {
        Self::new(config, crate::monitoring::source::platform_source())
    }

    /// Periodic tick from the control loop
    ///
    /// `elapsed` is the simulation-reported time since the previous tick; a
    /// sample is taken once the accumulated time crosses the configured
    /// interval and serves as the wall-clock basis for the CPU delta.
    pub fn tick(&self, elapsed: Duration, workload: usize) {
        let mut sampler = self.sampler.lock();
        sampler.pending += elapsed;
        if sampler.pending < self.config.sample_interval() {
            return;
        }
        let wall = sampler.pending;
        sampler.pending = Duration::ZERO;
        self.sample(&mut sampler, wall, workload);
    }

    /// Out-of-cadence immediate resample, bypassing the interval gate
    pub fn force_update(&self, workload: usize) {
        let mut sampler = self.sampler.lock();
        let wall = sampler
            .last_sample_at
            .map(|at| at.elapsed())
            .unwrap_or(Duration::ZERO);
        self.sample(&mut sampler, wall, workload);
    }

    /// Latest composite snapshot
    #[must_use]
    pub fn metrics(&self) -> Arc<ResourceMetrics> {
        self.snapshot.load_full()
    }

    /// Current overall pressure level
    #[inline]
    #[must_use]
    pub fn pressure(&self) -> PressureLevel {
        self.snapshot.load().pressure
    }

    /// Whether any admission may proceed
    #[inline]
    #[must_use]
    pub fn is_spawning_safe(&self) -> bool {
        self.pressure().is_spawning_safe()
    }

    /// Throttle factor for bulk admission
    #[inline]
    #[must_use]
    pub fn spawn_rate_multiplier(&self) -> f64 {
        self.pressure().spawn_rate_multiplier()
    }

    /// Take one sample and swap in a fresh snapshot
    fn sample(&self, sampler: &mut SamplerState, wall: Duration, workload: usize) {
        let now = Instant::now();
        let cpu_time = self.source.process_cpu_time();

        let cpu_pct = match (cpu_time, sampler.last_cpu_time) {
            (Some(current), Some(previous)) if !wall.is_zero() => {
                let spent = current.saturating_sub(previous).as_secs_f64();
                let cores = self.source.core_count().max(1) as f64;
                (spent / wall.as_secs_f64() / cores * 100.0).clamp(0.0, 100.0)
            }
            // No baseline yet, zero wall time, or a degraded source
            _ => 0.0,
        };
        if cpu_time.is_some() {
            sampler.last_cpu_time = cpu_time;
        }
        sampler.last_sample_at = Some(now);

        push_window(&mut sampler.win_short, CPU_WINDOW_SHORT, cpu_pct);
        push_window(&mut sampler.win_mid, CPU_WINDOW_MID, cpu_pct);
        push_window(&mut sampler.win_long, CPU_WINDOW_LONG, cpu_pct);

        let resident = self.source.resident_memory().unwrap_or(0);
        let total = self.source.total_memory().unwrap_or(0);
        let memory_pct = if total > 0 {
            (resident as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        // The 30-sample average drives CPU classification to damp spikes;
        // memory moves slowly enough to classify instantaneously
        let cpu_basis = mean(&sampler.win_mid);
        let cpu_level = PressureLevel::classify(cpu_basis, self.config.cpu_thresholds());
        let mem_level = PressureLevel::classify(memory_pct, self.config.mem_thresholds());
        let pressure = cpu_level.max(mem_level);

        if pressure != sampler.last_pressure {
            if pressure >= PressureLevel::High {
                warn!(
                    "Resource pressure {} -> {} (cpu avg {:.1}%, mem {:.1}%)",
                    sampler.last_pressure, pressure, cpu_basis, memory_pct
                );
            } else {
                info!(
                    "Resource pressure {} -> {} (cpu avg {:.1}%, mem {:.1}%)",
                    sampler.last_pressure, pressure, cpu_basis, memory_pct
                );
            }
            sampler.last_pressure = pressure;
        }

        self.snapshot.store(Arc::new(ResourceMetrics {
            cpu_pct,
            memory_pct,
            cpu_avg_short: mean(&sampler.win_short),
            cpu_avg_mid: cpu_basis,
            cpu_avg_long: mean(&sampler.win_long),
            resident_bytes: resident,
            total_memory_bytes: total,
            workload_instances: workload,
            pressure,
            sampled_at_micros: self.started_at.elapsed().as_micros() as u64,
        }));
    }
}

/// FIFO push, oldest dropped once the window exceeds capacity
fn push_window(window: &mut VecDeque<f64>, cap: usize, value: f64) {
    if window.len() == cap {
        window.pop_front();
    }
    window.push_back(value);
}

fn mean(window: &VecDeque<f64>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}
