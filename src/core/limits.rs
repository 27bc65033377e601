/*!
 * System Limits and Constants
 *
 * Centralized location for all control-plane limits, thresholds, and magic
 * numbers. Organized by domain for maintainability and discoverability.
 *
 * ## Design Philosophy
 * - All values include rationale comments explaining WHY they exist
 * - Values are grouped by domain (lifecycle, admission, monitoring, sessions)
 * - Performance-critical constants are marked with [PERF]
 */

use std::time::Duration;

// =============================================================================
// LIFECYCLE LIMITS
// =============================================================================

/// Transition history retained per entity
/// Enough to reconstruct a full happy-path lifecycle plus a failure detour
pub const STATE_HISTORY_CAP: usize = 10;

/// Maximum deferred events held per entity before enqueue is denied
/// Bounds per-entity memory when an entity is stuck in initialization
pub const MAX_QUEUED_EVENTS: usize = 256;

// =============================================================================
// ADMISSION / CIRCUIT BREAKER
// =============================================================================

/// Failure rate (percent of window) at which bulk admission halts
pub const BREAKER_OPEN_THRESHOLD_PCT: f64 = 10.0;

/// Failure rate below which a probing breaker may close again
/// Must stay at or below the open threshold to avoid flapping
pub const BREAKER_CLOSE_THRESHOLD_PCT: f64 = 5.0;

/// Time an open breaker waits before probing recovery
pub const BREAKER_COOLDOWN: Duration = Duration::from_secs(30);

/// Time a half-open breaker must stay healthy before closing
pub const BREAKER_RECOVERY_PERIOD: Duration = Duration::from_secs(60);

/// Retention horizon for attempt records in the sliding window
pub const BREAKER_WINDOW: Duration = Duration::from_secs(60);

/// Minimum attempts in the window before the failure rate is trusted
/// Below this the rate is statistically meaningless
pub const BREAKER_MIN_SAMPLES: usize = 20;

/// Spacing of trial admissions while half-open
pub const HALF_OPEN_PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Consecutive probe failures that force a reopen on the periodic check
pub const HALF_OPEN_FAILURE_LIMIT: u32 = 3;

// =============================================================================
// RESOURCE MONITORING
// =============================================================================

/// Host metric sampling cadence
/// Sampling is a fast local read; 1s keeps overhead negligible
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// CPU moving-average window lengths, in samples
/// [PERF] The 30-sample average drives pressure classification to damp spikes
pub const CPU_WINDOW_SHORT: usize = 5;
pub const CPU_WINDOW_MID: usize = 30;
pub const CPU_WINDOW_LONG: usize = 60;

/// Ascending CPU pressure thresholds (percent, against the 30-sample average)
pub const CPU_ELEVATED_PCT: f64 = 60.0;
pub const CPU_HIGH_PCT: f64 = 75.0;
pub const CPU_CRITICAL_PCT: f64 = 90.0;

/// Ascending memory pressure thresholds (percent of physical memory resident)
pub const MEM_ELEVATED_PCT: f64 = 70.0;
pub const MEM_HIGH_PCT: f64 = 80.0;
pub const MEM_CRITICAL_PCT: f64 = 90.0;

// =============================================================================
// SESSION POOL
// =============================================================================

/// Pool floor: cleanup never shrinks below this
pub const POOL_MIN_SIZE: usize = 8;

/// Pool ceiling: releases beyond this are dropped instead of pooled
pub const POOL_MAX_SIZE: usize = 128;

/// Sessions pre-constructed at startup
pub const POOL_INITIAL_SIZE: usize = 16;

/// Cadence of the prefix-scan eviction pass
pub const POOL_CLEANUP_INTERVAL: Duration = Duration::from_secs(30);

/// Sessions older than this fail the reusability check
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(600);

/// I/O buffer capacity reserved per session (the expensive part)
/// [PERF] Sized for a full outbound state burst without reallocation
pub const SESSION_BUFFER_CAPACITY: usize = 16 * 1024;

/// Buffers grown beyond this make a session non-reusable
pub const SESSION_BUFFER_BLOAT_LIMIT: usize = 64 * 1024;

// =============================================================================
// CONTROL LOOP
// =============================================================================

/// Default control tick interval
/// Sub-second so breaker cooldown and probe timing resolve promptly;
/// the resource monitor applies its own 1s gate on top
pub const CONTROL_TICK_INTERVAL: Duration = Duration::from_millis(250);
