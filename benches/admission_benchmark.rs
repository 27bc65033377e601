/*!
 * Admission Control Benchmarks
 *
 * Hot-path costs: lifecycle transitions, guard checks, pool round-trips,
 * and the breaker gate
 */

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use swarm_kernel::core::config::{BreakerConfig, PoolConfig};
use swarm_kernel::{EntityId, LifecycleManager, SessionPool, SpawnCircuitBreaker};

fn bench_lifecycle_chain(c: &mut Criterion) {
    c.bench_function("lifecycle_full_chain", |b| {
        b.iter(|| {
            let manager = LifecycleManager::new(EntityId(1));
            manager.start_data_load().unwrap();
            manager.start_manager_init().unwrap();
            manager.mark_ready().unwrap();
            manager.mark_active().unwrap();
            manager.start_removal().unwrap();
            manager.mark_destroyed().unwrap();
            black_box(manager.current_state())
        })
    });
}

fn bench_guard_check(c: &mut Criterion) {
    let manager = LifecycleManager::new(EntityId(1));
    manager.start_data_load().unwrap();
    manager.start_manager_init().unwrap();
    manager.mark_ready().unwrap();

    c.bench_function("guard_check", |b| {
        b.iter(|| black_box(manager.try_guard().is_ok()))
    });
}

fn bench_pool_round_trip(c: &mut Criterion) {
    let pool = SessionPool::new(PoolConfig {
        initial_size: 1,
        ..PoolConfig::default()
    });
    pool.initialize();

    c.bench_function("session_pool_round_trip", |b| {
        b.iter(|| {
            let handle = pool.acquire(EntityId(1));
            pool.release(black_box(handle));
        })
    });
}

fn bench_breaker_gate(c: &mut Criterion) {
    let breaker = SpawnCircuitBreaker::new(BreakerConfig::default());
    breaker.record_success();

    c.bench_function("breaker_allow_spawn", |b| {
        b.iter(|| black_box(breaker.allow_spawn()))
    });
}

criterion_group!(
    benches,
    bench_lifecycle_chain,
    bench_guard_check,
    bench_pool_round_trip,
    bench_breaker_gate
);
criterion_main!(benches);
