/*!
 * Spawn Circuit Breaker
 *
 * Halts bulk admission when the recent failure rate is too high, then
 * probes recovery gradually. Three states: Closed (normal), Open (blocked),
 * HalfOpen (rate-limited trial admissions).
 *
 * # Concurrency
 *
 * The state word is atomic so `allow_spawn` and snapshot reads never block
 * the tick thread; the attempt window sits behind one coarse lock per
 * breaker instance.
 */

use crate::core::config::BreakerConfig;
use crate::core::limits::HALF_OPEN_FAILURE_LIMIT;
use crate::admission::types::{AttemptRecord, BreakerState, BreakerStats};
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Instant;

/// Window state behind the coarse lock
struct Window {
    /// Time-ordered attempt outcomes; entries older than the configured
    /// window duration are evicted lazily
    attempts: VecDeque<AttemptRecord>,
    consecutive_failures: u32,
    /// Failures recorded since entering HalfOpen
    half_open_failures: u32,
    entered_state_at: Instant,
    last_attempt_at: Option<Instant>,
}

/// Admission gate driven by the observed failure rate
pub struct SpawnCircuitBreaker {
    config: BreakerConfig,
    state: AtomicU8,
    window: Mutex<Window>,
    total_attempts: AtomicU64,
    total_failures: AtomicU64,
}

impl SpawnCircuitBreaker {
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: AtomicU8::new(BreakerState::Closed.as_u8()),
            window: Mutex::new(Window {
                attempts: VecDeque::new(),
                consecutive_failures: 0,
                half_open_failures: 0,
                entered_state_at: Instant::now(),
                last_attempt_at: None,
            }),
            total_attempts: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
        }
    }

    /// Current state, readable without taking the window lock
    #[inline]
    #[must_use]
    pub fn state(&self) -> BreakerState {
        BreakerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Gate one admission attempt
    ///
    /// Closed always allows, Open always denies, HalfOpen allows at most one
    /// probe per configured interval, measured from the last recorded
    /// attempt.
    #[must_use]
    pub fn allow_spawn(&self) -> bool {
        match self.state() {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            BreakerState::HalfOpen => {
                let window = self.window.lock();
                window
                    .last_attempt_at
                    .map_or(true, |at| at.elapsed() >= self.config.probe_interval())
            }
        }
    }

    /// Record a successful admission
    pub fn record_success(&self) {
        self.total_attempts.fetch_add(1, Ordering::Relaxed);
        let mut window = self.window.lock();
        window.attempts.push_back(AttemptRecord {
            at: Instant::now(),
            success: true,
        });
        window.last_attempt_at = Some(Instant::now());
        window.consecutive_failures = 0;
    }

    /// Record a failed admission
    ///
    /// A failure recorded while HalfOpen forces an immediate reopen.
    pub fn record_failure(&self, reason: &str) {
        self.total_attempts.fetch_add(1, Ordering::Relaxed);
        self.total_failures.fetch_add(1, Ordering::Relaxed);

        let mut window = self.window.lock();
        window.attempts.push_back(AttemptRecord {
            at: Instant::now(),
            success: false,
        });
        window.last_attempt_at = Some(Instant::now());
        window.consecutive_failures += 1;
        debug!(
            "Admission failure recorded ({}), {} consecutive",
            reason, window.consecutive_failures
        );

        if self.state() == BreakerState::HalfOpen {
            window.half_open_failures += 1;
            self.transition(&mut window, BreakerState::Open, "failure while probing");
        }
    }

    /// Periodic evaluation, driven once per control tick
    pub fn tick(&self) {
        let mut window = self.window.lock();
        self.evict_expired(&mut window);
        let rate = Self::failure_rate(&window);

        match self.state() {
            BreakerState::Closed => {
                // Strictly above the threshold: a window sitting exactly at
                // the configured rate stays closed
                if window.attempts.len() >= self.config.min_samples
                    && rate > self.config.open_threshold_pct
                {
                    let reason = format!(
                        "failure rate {:.1}% > {:.1}% over {} attempts",
                        rate,
                        self.config.open_threshold_pct,
                        window.attempts.len()
                    );
                    self.transition(&mut window, BreakerState::Open, &reason);
                }
            }
            BreakerState::Open => {
                if window.entered_state_at.elapsed() >= self.config.cooldown() {
                    self.transition(&mut window, BreakerState::HalfOpen, "cooldown elapsed");
                }
            }
            BreakerState::HalfOpen => {
                if window.half_open_failures >= HALF_OPEN_FAILURE_LIMIT {
                    self.transition(&mut window, BreakerState::Open, "probe failures");
                } else if window.entered_state_at.elapsed() >= self.config.recovery_period()
                    && rate < self.config.close_threshold_pct
                {
                    let reason = format!(
                        "recovered: failure rate {:.1}% < {:.1}%",
                        rate, self.config.close_threshold_pct
                    );
                    self.transition(&mut window, BreakerState::Closed, &reason);
                }
            }
        }
    }

    /// Administrative override: force Closed and clear all tracking
    pub fn reset(&self) {
        let mut window = self.window.lock();
        window.attempts.clear();
        window.consecutive_failures = 0;
        window.half_open_failures = 0;
        window.last_attempt_at = None;
        window.entered_state_at = Instant::now();
        let old = self.state();
        self.state
            .store(BreakerState::Closed.as_u8(), Ordering::Release);
        info!("Circuit breaker reset: {} -> closed, window cleared", old);
    }

    /// Statistics snapshot
    #[must_use]
    pub fn stats(&self) -> BreakerStats {
        let mut window = self.window.lock();
        self.evict_expired(&mut window);
        BreakerStats {
            state: self.state(),
            window_size: window.attempts.len(),
            failure_rate_pct: Self::failure_rate(&window),
            total_attempts: self.total_attempts.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            consecutive_failures: window.consecutive_failures,
            time_in_state_micros: window.entered_state_at.elapsed().as_micros() as u64,
        }
    }

    /// Failed share of the window, 0% when empty
    fn failure_rate(window: &Window) -> f64 {
        if window.attempts.is_empty() {
            return 0.0;
        }
        let failures = window.attempts.iter().filter(|a| !a.success).count();
        failures as f64 / window.attempts.len() as f64 * 100.0
    }

    /// Drop records older than the retention horizon
    fn evict_expired(&self, window: &mut Window) {
        let horizon = self.config.window();
        while window
            .attempts
            .front()
            .is_some_and(|a| a.at.elapsed() > horizon)
        {
            window.attempts.pop_front();
        }
    }

    /// Apply a state change: reset the entry clock and per-state counters,
    /// log old state, new state, and trigger reason
    fn transition(&self, window: &mut Window, next: BreakerState, reason: &str) {
        let old = self.state();
        if old == next {
            return;
        }
        self.state.store(next.as_u8(), Ordering::Release);
        window.entered_state_at = Instant::now();
        match next {
            BreakerState::Closed | BreakerState::HalfOpen => {
                window.consecutive_failures = 0;
                window.half_open_failures = 0;
            }
            BreakerState::Open => {
                window.half_open_failures = 0;
            }
        }
        info!("Circuit breaker {} -> {} ({})", old, next, reason);
    }

    /// Force a specific state (tests and operator tooling)
    #[doc(hidden)]
    pub fn force_state(&self, next: BreakerState) {
        let mut window = self.window.lock();
        self.transition(&mut window, next, "forced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> BreakerConfig {
        BreakerConfig {
            open_threshold_pct: 10.0,
            close_threshold_pct: 5.0,
            cooldown_secs: 0,
            recovery_secs: 0,
            window_secs: 60,
            min_samples: 20,
            probe_interval_ms: 50,
        }
    }

    fn feed(breaker: &SpawnCircuitBreaker, failures: usize, successes: usize) {
        for _ in 0..failures {
            breaker.record_failure("test");
        }
        for _ in 0..successes {
            breaker.record_success();
        }
    }

    #[test]
    fn test_stays_closed_at_threshold() {
        let breaker = SpawnCircuitBreaker::new(test_config());
        feed(&breaker, 2, 18); // exactly 10%
        breaker.tick();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.allow_spawn());
    }

    #[test]
    fn test_opens_above_threshold_with_min_samples() {
        let breaker = SpawnCircuitBreaker::new(test_config());
        feed(&breaker, 3, 17); // 15%
        breaker.tick();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.allow_spawn());
    }

    #[test]
    fn test_rate_not_trusted_below_min_samples() {
        let breaker = SpawnCircuitBreaker::new(test_config());
        feed(&breaker, 5, 0); // 100%, but only 5 attempts
        breaker.tick();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens_immediately() {
        let breaker = SpawnCircuitBreaker::new(test_config());
        breaker.force_state(BreakerState::HalfOpen);
        breaker.record_failure("probe failed");
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn test_cooldown_moves_open_to_half_open() {
        let breaker = SpawnCircuitBreaker::new(test_config()); // zero cooldown
        breaker.force_state(BreakerState::Open);
        std::thread::sleep(Duration::from_millis(5));
        breaker.tick();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
    }

    #[test]
    fn test_half_open_probe_rate_limit() {
        let breaker = SpawnCircuitBreaker::new(test_config());
        breaker.force_state(BreakerState::HalfOpen);
        assert!(breaker.allow_spawn());
        breaker.record_success();
        // Inside the probe interval: denied
        assert!(!breaker.allow_spawn());
        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.allow_spawn());
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let breaker = SpawnCircuitBreaker::new(test_config());
        breaker.record_failure("a");
        breaker.record_failure("b");
        breaker.record_success();
        assert_eq!(breaker.stats().consecutive_failures, 0);
    }

    #[test]
    fn test_reset_forces_closed_and_clears_window() {
        let breaker = SpawnCircuitBreaker::new(test_config());
        feed(&breaker, 3, 17);
        breaker.tick();
        assert_eq!(breaker.state(), BreakerState::Open);
        breaker.reset();
        assert_eq!(breaker.state(), BreakerState::Closed);
        let stats = breaker.stats();
        assert_eq!(stats.window_size, 0);
        assert_eq!(stats.failure_rate_pct, 0.0);
    }

    #[test]
    fn test_empty_window_rate_is_zero() {
        let breaker = SpawnCircuitBreaker::new(test_config());
        assert_eq!(breaker.stats().failure_rate_pct, 0.0);
    }
}
