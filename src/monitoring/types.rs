/*!
 * Monitoring Types
 * Pressure levels and the composite metrics snapshot
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host load severity, from the admission layer's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureLevel {
    Normal,
    Elevated,
    High,
    Critical,
}

impl PressureLevel {
    /// Classify a percentage against three ascending thresholds
    #[must_use]
    pub fn classify(value_pct: f64, thresholds: [f64; 3]) -> Self {
        if value_pct >= thresholds[2] {
            Self::Critical
        } else if value_pct >= thresholds[1] {
            Self::High
        } else if value_pct >= thresholds[0] {
            Self::Elevated
        } else {
            Self::Normal
        }
    }

    /// Throttle factor applied to bulk admission
    ///
    /// # Performance
    /// Hot path - consulted on every admission decision
    #[inline(always)]
    #[must_use]
    pub const fn spawn_rate_multiplier(self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Elevated => 0.5,
            Self::High => 0.25,
            Self::Critical => 0.0,
        }
    }

    /// Whether any admission may proceed at all
    #[inline(always)]
    #[must_use]
    pub const fn is_spawning_safe(self) -> bool {
        !matches!(self, Self::Critical)
    }
}

impl fmt::Display for PressureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Composite host metrics snapshot
///
/// Recomputed wholesale on each sampling tick and swapped in atomically;
/// readers never observe a partial update.
///
/// # Performance
/// - Cache-line aligned for frequent reads by the admission path
#[repr(C, align(64))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceMetrics {
    /// Instantaneous process CPU utilization, percent of all cores
    pub cpu_pct: f64,
    /// Resident set as a percentage of physical memory
    pub memory_pct: f64,
    /// CPU moving averages over the last 5/30/60 samples
    pub cpu_avg_short: f64,
    pub cpu_avg_mid: f64,
    pub cpu_avg_long: f64,
    pub resident_bytes: u64,
    pub total_memory_bytes: u64,
    /// Workload-size metric pulled from the world collaborator
    pub workload_instances: usize,
    pub pressure: PressureLevel,
    /// Microseconds since monitor start when this snapshot was taken
    pub sampled_at_micros: u64,
}

impl ResourceMetrics {
    /// Zeroed snapshot used before the first sample (and when the platform
    /// source degrades)
    #[must_use]
    pub fn empty() -> Self {
        Self {
            cpu_pct: 0.0,
            memory_pct: 0.0,
            cpu_avg_short: 0.0,
            cpu_avg_mid: 0.0,
            cpu_avg_long: 0.0,
            resident_bytes: 0,
            total_memory_bytes: 0,
            workload_instances: 0,
            pressure: PressureLevel::Normal,
            sampled_at_micros: 0,
        }
    }
}

impl Default for ResourceMetrics {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_boundaries() {
        let thresholds = [60.0, 75.0, 90.0];
        assert_eq!(PressureLevel::classify(0.0, thresholds), PressureLevel::Normal);
        assert_eq!(PressureLevel::classify(59.9, thresholds), PressureLevel::Normal);
        assert_eq!(PressureLevel::classify(60.0, thresholds), PressureLevel::Elevated);
        assert_eq!(PressureLevel::classify(75.0, thresholds), PressureLevel::High);
        assert_eq!(PressureLevel::classify(90.0, thresholds), PressureLevel::Critical);
        assert_eq!(PressureLevel::classify(150.0, thresholds), PressureLevel::Critical);
    }

    #[test]
    fn test_multiplier_ladder() {
        assert_eq!(PressureLevel::Normal.spawn_rate_multiplier(), 1.0);
        assert_eq!(PressureLevel::Elevated.spawn_rate_multiplier(), 0.5);
        assert_eq!(PressureLevel::High.spawn_rate_multiplier(), 0.25);
        assert_eq!(PressureLevel::Critical.spawn_rate_multiplier(), 0.0);
    }

    #[test]
    fn test_only_critical_blocks_spawning() {
        assert!(PressureLevel::Normal.is_spawning_safe());
        assert!(PressureLevel::High.is_spawning_safe());
        assert!(!PressureLevel::Critical.is_spawning_safe());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(PressureLevel::Critical > PressureLevel::High);
        assert!(PressureLevel::High > PressureLevel::Elevated);
        assert!(PressureLevel::Elevated > PressureLevel::Normal);
    }
}
