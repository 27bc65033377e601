/*!
 * Spawn Circuit Breaker Tests
 * Threshold behavior, probing, recovery, and operator reset
 */

use pretty_assertions::assert_eq;
use std::time::Duration;
use swarm_kernel::core::config::BreakerConfig;
use swarm_kernel::{BreakerState, SpawnCircuitBreaker};

fn config() -> BreakerConfig {
    BreakerConfig {
        open_threshold_pct: 10.0,
        close_threshold_pct: 5.0,
        cooldown_secs: 0,
        recovery_secs: 0,
        window_secs: 60,
        min_samples: 20,
        probe_interval_ms: 40,
    }
}

fn feed(breaker: &SpawnCircuitBreaker, failures: usize, successes: usize) {
    for _ in 0..failures {
        breaker.record_failure("synthetic");
    }
    for _ in 0..successes {
        breaker.record_success();
    }
}

#[test]
fn test_two_failures_in_twenty_stays_closed() {
    let breaker = SpawnCircuitBreaker::new(config());
    feed(&breaker, 2, 18); // 10%, exactly at the threshold
    breaker.tick();
    assert_eq!(breaker.state(), BreakerState::Closed);
    assert!(breaker.allow_spawn());
}

#[test]
fn test_three_failures_in_twenty_opens() {
    let breaker = SpawnCircuitBreaker::new(config());
    feed(&breaker, 3, 17); // 15%
    breaker.tick();
    assert_eq!(breaker.state(), BreakerState::Open);
    assert!(!breaker.allow_spawn());
}

#[test]
fn test_open_probes_after_cooldown() {
    let breaker = SpawnCircuitBreaker::new(config());
    feed(&breaker, 3, 17);
    breaker.tick();
    assert_eq!(breaker.state(), BreakerState::Open);

    // Zero cooldown: the next periodic check starts probing
    std::thread::sleep(Duration::from_millis(5));
    breaker.tick();
    assert_eq!(breaker.state(), BreakerState::HalfOpen);
}

#[test]
fn test_single_failure_while_probing_reopens() {
    let breaker = SpawnCircuitBreaker::new(config());
    feed(&breaker, 3, 17);
    breaker.tick();
    std::thread::sleep(Duration::from_millis(5));
    breaker.tick();
    assert_eq!(breaker.state(), BreakerState::HalfOpen);

    breaker.record_failure("probe admission failed");
    assert_eq!(breaker.state(), BreakerState::Open);
}

#[test]
fn test_probe_admissions_are_rate_limited() {
    let breaker = SpawnCircuitBreaker::new(config());
    breaker.force_state(BreakerState::HalfOpen);

    assert!(breaker.allow_spawn());
    breaker.record_success();
    assert!(!breaker.allow_spawn(), "second probe inside the interval");

    std::thread::sleep(Duration::from_millis(50));
    assert!(breaker.allow_spawn(), "interval elapsed, probing resumes");
}

#[test]
fn test_recovery_closes_once_rate_subsides() {
    // Zero retention: the failures that opened the breaker age out before
    // the recovery check runs
    let breaker = SpawnCircuitBreaker::new(BreakerConfig {
        window_secs: 0,
        ..config()
    });
    feed(&breaker, 3, 17);
    breaker.force_state(BreakerState::Open);
    std::thread::sleep(Duration::from_millis(5));
    breaker.tick(); // -> half-open (cooldown 0)
    assert_eq!(breaker.state(), BreakerState::HalfOpen);
    std::thread::sleep(Duration::from_millis(5));
    breaker.tick(); // recovery 0 elapsed, rate 0% < 5% -> closed
    assert_eq!(breaker.state(), BreakerState::Closed);
}

#[test]
fn test_insufficient_samples_never_open() {
    let breaker = SpawnCircuitBreaker::new(config());
    feed(&breaker, 19, 0); // 100% failure, one short of min samples
    breaker.tick();
    assert_eq!(breaker.state(), BreakerState::Closed);
}

#[test]
fn test_reset_is_unconditional() {
    let breaker = SpawnCircuitBreaker::new(config());
    feed(&breaker, 10, 10);
    breaker.tick();
    assert_eq!(breaker.state(), BreakerState::Open);

    breaker.reset();
    assert_eq!(breaker.state(), BreakerState::Closed);
    let stats = breaker.stats();
    assert_eq!(stats.window_size, 0);
    assert_eq!(stats.failure_rate_pct, 0.0);
    assert_eq!(stats.consecutive_failures, 0);
    // Lifetime totals survive a reset
    assert_eq!(stats.total_attempts, 20);
    assert_eq!(stats.total_failures, 10);
}

#[test]
fn test_stats_reflect_window() {
    let breaker = SpawnCircuitBreaker::new(config());
    feed(&breaker, 1, 3);
    let stats = breaker.stats();
    assert_eq!(stats.window_size, 4);
    assert_eq!(stats.failure_rate_pct, 25.0);
    assert_eq!(stats.state, BreakerState::Closed);
}
