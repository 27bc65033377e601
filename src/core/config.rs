/*!
 * Configuration
 * One-shot loading of named numeric/time parameters for all components
 *
 * Parameters are read once at initialization from an optional JSON file
 * (`SWARM_CONFIG_PATH`) with defaults drawn from `core::limits`. Re-invoking
 * the load is safe; nothing here hot-reloads.
 */

use crate::core::errors::ConfigError;
use crate::core::limits;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable naming the JSON config file
pub const CONFIG_PATH_ENV: &str = "SWARM_CONFIG_PATH";

/// Circuit breaker tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct BreakerConfig {
    /// Failure rate (%) that opens the breaker
    pub open_threshold_pct: f64,
    /// Failure rate (%) below which a probing breaker closes; must be <= open
    pub close_threshold_pct: f64,
    /// Seconds an open breaker waits before probing
    pub cooldown_secs: u64,
    /// Seconds a half-open breaker must stay healthy before closing
    pub recovery_secs: u64,
    /// Sliding-window retention in seconds
    pub window_secs: u64,
    /// Minimum window size before the failure rate is trusted
    pub min_samples: usize,
    /// Milliseconds between trial admissions while half-open
    pub probe_interval_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            open_threshold_pct: limits::BREAKER_OPEN_THRESHOLD_PCT,
            close_threshold_pct: limits::BREAKER_CLOSE_THRESHOLD_PCT,
            cooldown_secs: limits::BREAKER_COOLDOWN.as_secs(),
            recovery_secs: limits::BREAKER_RECOVERY_PERIOD.as_secs(),
            window_secs: limits::BREAKER_WINDOW.as_secs(),
            min_samples: limits::BREAKER_MIN_SAMPLES,
            probe_interval_ms: limits::HALF_OPEN_PROBE_INTERVAL.as_millis() as u64,
        }
    }
}

impl BreakerConfig {
    #[inline]
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    #[inline]
    #[must_use]
    pub fn recovery_period(&self) -> Duration {
        Duration::from_secs(self.recovery_secs)
    }

    #[inline]
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    #[inline]
    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}

/// Resource monitor tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct MonitorConfig {
    /// Milliseconds between host metric samples
    pub sample_interval_ms: u64,
    /// Ascending CPU pressure thresholds (%), against the 30-sample average
    pub cpu_elevated_pct: f64,
    pub cpu_high_pct: f64,
    pub cpu_critical_pct: f64,
    /// Ascending memory pressure thresholds (% of physical memory)
    pub mem_elevated_pct: f64,
    pub mem_high_pct: f64,
    pub mem_critical_pct: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: limits::SAMPLE_INTERVAL.as_millis() as u64,
            cpu_elevated_pct: limits::CPU_ELEVATED_PCT,
            cpu_high_pct: limits::CPU_HIGH_PCT,
            cpu_critical_pct: limits::CPU_CRITICAL_PCT,
            mem_elevated_pct: limits::MEM_ELEVATED_PCT,
            mem_high_pct: limits::MEM_HIGH_PCT,
            mem_critical_pct: limits::MEM_CRITICAL_PCT,
        }
    }
}

impl MonitorConfig {
    #[inline]
    #[must_use]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    #[inline]
    #[must_use]
    pub fn cpu_thresholds(&self) -> [f64; 3] {
        [self.cpu_elevated_pct, self.cpu_high_pct, self.cpu_critical_pct]
    }

    #[inline]
    #[must_use]
    pub fn mem_thresholds(&self) -> [f64; 3] {
        [self.mem_elevated_pct, self.mem_high_pct, self.mem_critical_pct]
    }
}

/// Session pool tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PoolConfig {
    /// Cleanup never shrinks the pool below this
    pub min_size: usize,
    /// Releases beyond this are dropped instead of pooled
    pub max_size: usize,
    /// Sessions pre-constructed by `initialize`
    pub initial_size: usize,
    /// Milliseconds between prefix-scan eviction passes
    pub cleanup_interval_ms: u64,
    /// Seconds after which a session fails the reusability check
    pub session_max_age_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: limits::POOL_MIN_SIZE,
            max_size: limits::POOL_MAX_SIZE,
            initial_size: limits::POOL_INITIAL_SIZE,
            cleanup_interval_ms: limits::POOL_CLEANUP_INTERVAL.as_millis() as u64,
            session_max_age_secs: limits::SESSION_MAX_AGE.as_secs(),
        }
    }
}

impl PoolConfig {
    #[inline]
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    #[inline]
    #[must_use]
    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_secs)
    }
}

/// Top-level control-plane configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct KernelConfig {
    pub breaker: BreakerConfig,
    pub monitor: MonitorConfig,
    pub pool: PoolConfig,
    /// Milliseconds between control ticks driven by the background task
    pub control_tick_ms: Option<u64>,
}

impl KernelConfig {
    /// Load configuration from the environment, falling back to defaults
    ///
    /// Reads the JSON file named by `SWARM_CONFIG_PATH` when set. A missing
    /// or invalid file logs a warning and yields the defaults; it never
    /// aborts startup.
    pub fn load() -> Self {
        let config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => match Self::from_file(&path) {
                Ok(config) => {
                    info!("Configuration loaded from {}", path);
                    config
                }
                Err(e) => {
                    warn!("Ignoring config file: {}", e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load and validate a JSON config file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&raw)
    }

    /// Parse a JSON config document
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.breaker.close_threshold_pct > self.breaker.open_threshold_pct {
            return Err(ConfigError::Invalid(format!(
                "breaker close threshold {}% exceeds open threshold {}%",
                self.breaker.close_threshold_pct, self.breaker.open_threshold_pct
            )));
        }
        if self.pool.min_size > self.pool.max_size {
            return Err(ConfigError::Invalid(format!(
                "pool min size {} exceeds max size {}",
                self.pool.min_size, self.pool.max_size
            )));
        }
        if self.pool.initial_size > self.pool.max_size {
            return Err(ConfigError::Invalid(format!(
                "pool initial size {} exceeds max size {}",
                self.pool.initial_size, self.pool.max_size
            )));
        }
        let cpu = self.monitor.cpu_thresholds();
        let mem = self.monitor.mem_thresholds();
        if cpu.windows(2).any(|w| w[0] >= w[1]) || mem.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::Invalid(
                "pressure thresholds must be strictly ascending".to_string(),
            ));
        }
        Ok(())
    }

    /// Control tick interval for the background task
    #[inline]
    #[must_use]
    pub fn control_tick(&self) -> Duration {
        self.control_tick_ms
            .map(Duration::from_millis)
            .unwrap_or(limits::CONTROL_TICK_INTERVAL)
    }
}
