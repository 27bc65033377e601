/*!
 * Admission Controller
 *
 * Orchestration layer owning the single monitor, breaker, and pool
 * instances plus the per-entity lifecycle manager registry. Each admission
 * decision runs the gates in order: resource pressure, spawn-rate throttle,
 * circuit breaker, session acquisition, manager creation.
 */

use crate::admission::breaker::SpawnCircuitBreaker;
use crate::core::config::KernelConfig;
use crate::core::errors::{AdmissionError, AdmissionResult};
use crate::core::types::{EntityId, EntityIdGenerator};
use crate::lifecycle::{LifecycleManager, LifecycleState};
use crate::monitoring::monitor::ResourceMonitor;
use crate::monitoring::source::MetricsSource;
use crate::monitoring::traits::{NullWorld, WorldCollaborator};
use crate::monitoring::types::PressureLevel;
use crate::session::pool::{SessionHandle, SessionPool};
use dashmap::DashMap;
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Everything handed to the caller on a successful admission
pub struct Admission {
    pub entity_id: EntityId,
    pub manager: Arc<LifecycleManager>,
    pub session: SessionHandle,
}

/// Builder for AdmissionController
pub struct AdmissionControllerBuilder {
    config: KernelConfig,
    world: Option<Arc<dyn WorldCollaborator>>,
    source: Option<Box<dyn MetricsSource>>,
}

impl AdmissionControllerBuilder {
    #[must_use]
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            world: None,
            source: None,
        }
    }

    /// Attach the world/simulation collaborator
    #[must_use]
    pub fn with_world(mut self, world: Arc<dyn WorldCollaborator>) -> Self {
        self.world = Some(world);
        self
    }

    /// Override the host metrics source (tests, diagnostics)
    #[must_use]
    pub fn with_metrics_source(mut self, source: Box<dyn MetricsSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Build the controller and pre-populate the session pool
    #[must_use]
    pub fn build(self) -> AdmissionController {
        let monitor = match self.source {
            Some(source) => ResourceMonitor::new(self.config.monitor.clone(), source),
            None => ResourceMonitor::with_platform_source(self.config.monitor.clone()),
        };
        let pool = SessionPool::new(self.config.pool.clone());
        pool.initialize();

        let mut features = vec!["monitor", "breaker", "pool"];
        if self.world.is_some() {
            features.push("world");
        }
        info!("Admission controller initialized with: {}", features.join(", "));

        AdmissionController {
            monitor: Arc::new(monitor),
            breaker: Arc::new(SpawnCircuitBreaker::new(self.config.breaker.clone())),
            pool: Arc::new(pool),
            world: self.world.unwrap_or_else(|| Arc::new(NullWorld)),
            entities: DashMap::new(),
            id_gen: EntityIdGenerator::new(),
            throttle_seen: AtomicU64::new(0),
            last_notified: Mutex::new(None),
        }
    }
}

/// Owner of the control-plane components and the entity registry
pub struct AdmissionController {
    monitor: Arc<ResourceMonitor>,
    breaker: Arc<SpawnCircuitBreaker>,
    pool: Arc<SessionPool>,
    world: Arc<dyn WorldCollaborator>,
    entities: DashMap<EntityId, Arc<LifecycleManager>>,
    id_gen: EntityIdGenerator,
    /// Attempts seen while throttled, for the deterministic rate gate
    throttle_seen: AtomicU64,
    last_notified: Mutex<Option<PressureLevel>>,
}

impl AdmissionController {
    #[must_use]
    pub fn builder(config: KernelConfig) -> AdmissionControllerBuilder {
        AdmissionControllerBuilder::new(config)
    }

    /// Attempt to admit one new entity
    ///
    /// Runs the full admission path and records the outcome on the circuit
    /// breaker. The returned lifecycle manager starts in Created; the caller
    /// drives it through its phases.
    pub fn admit(&self) -> AdmissionResult<Admission> {
        if !self.monitor.is_spawning_safe() {
            return Err(AdmissionError::PressureCritical);
        }

        let multiplier = self.monitor.spawn_rate_multiplier();
        if !self.throttle_allows(multiplier) {
            return Err(AdmissionError::Throttled {
                multiplier_pct: (multiplier * 100.0) as u8,
            });
        }

        if !self.breaker.allow_spawn() {
            return Err(AdmissionError::BreakerDenied {
                state: self.breaker.state(),
            });
        }

        let entity_id = self.id_gen.next();
        let session = self.pool.acquire(entity_id);
        let manager = Arc::new(LifecycleManager::new(entity_id));
        self.entities.insert(entity_id, Arc::clone(&manager));
        self.breaker.record_success();
        debug!("Entity {} admitted", entity_id);

        Ok(Admission {
            entity_id,
            manager,
            session,
        })
    }

    /// Report a failed admission: force the entity to Failed, record the
    /// failure on the breaker, and reclaim its session
    pub fn fail_admission(&self, entity: EntityId, reason: &str) -> AdmissionResult<()> {
        let manager = self.manager(entity).ok_or(AdmissionError::EntityNotFound(entity))?;
        manager.mark_failed(reason);
        self.breaker.record_failure(reason);
        self.pool.return_session(entity);
        Ok(())
    }

    /// Drive an entity out of the world and drop it from the registry
    pub fn remove(&self, entity: EntityId) -> AdmissionResult<()> {
        let manager = self.manager(entity).ok_or(AdmissionError::EntityNotFound(entity))?;
        match manager.current_state() {
            LifecycleState::Failed => manager.mark_destroyed()?,
            LifecycleState::Destroyed => {}
            _ => {
                manager.start_removal()?;
                manager.mark_destroyed()?;
            }
        }
        self.pool.return_session(entity);
        self.entities.remove(&entity);
        info!("Entity {} removed", entity);
        Ok(())
    }

    /// Periodic control tick, driven by the simulation loop or ControlTask
    pub fn tick(&self, elapsed: Duration) {
        // The workload metric is pulled before any control-plane lock is held
        let workload = self.world.instance_count();
        self.monitor.tick(elapsed, workload);
        self.breaker.tick();
        self.pool.tick();
        self.notify_throttle_change();
    }

    /// Lifecycle manager for an admitted entity
    #[must_use]
    pub fn manager(&self, entity: EntityId) -> Option<Arc<LifecycleManager>> {
        self.entities.get(&entity).map(|e| Arc::clone(e.value()))
    }

    /// Number of entities currently registered
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn monitor(&self) -> Arc<ResourceMonitor> {
        Arc::clone(&self.monitor)
    }

    #[must_use]
    pub fn breaker(&self) -> Arc<SpawnCircuitBreaker> {
        Arc::clone(&self.breaker)
    }

    #[must_use]
    pub fn pool(&self) -> Arc<SessionPool> {
        Arc::clone(&self.pool)
    }

    /// Deterministic rate gate for partial multipliers
    ///
    /// Admits every Nth attempt where N is the inverse multiplier, so a
    /// 0.25 multiplier admits one attempt in four. Counter-based rather than
    /// random to keep the control path reproducible.
    fn throttle_allows(&self, multiplier: f64) -> bool {
        // Zero multiplier never reaches here; the safety gate rejects first
        let stride = (1.0 / multiplier).round() as u64;
        if stride <= 1 {
            return true;
        }
        let seen = self.throttle_seen.fetch_add(1, Ordering::Relaxed);
        seen % stride == 0
    }

    /// Push the throttle decision to the world on pressure edges only
    fn notify_throttle_change(&self) {
        let pressure = self.monitor.pressure();
        {
            let mut last = self.last_notified.lock();
            if *last == Some(pressure) {
                return;
            }
            *last = Some(pressure);
        }
        // Collaborator call happens after the lock is dropped
        self.world
            .on_throttle_update(pressure.spawn_rate_multiplier(), pressure.is_spawning_safe());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::source::SyntheticSource;

    fn controller() -> (AdmissionController, SyntheticSource) {
        let source = SyntheticSource::new(1);
        let feeder = source.clone();
        let controller = AdmissionController::builder(KernelConfig::default())
            .with_metrics_source(Box::new(source))
            .build();
        (controller, feeder)
    }

    #[test]
    fn test_admit_creates_entity_in_created_state() {
        let (controller, _feeder) = controller();
        let admission = controller.admit().unwrap();
        assert_eq!(admission.manager.current_state(), LifecycleState::Created);
        assert_eq!(controller.entity_count(), 1);
        assert!(admission.session.lock().bound_entity().is_some());
    }

    #[test]
    fn test_critical_pressure_denies_admission() {
        let (controller, feeder) = controller();
        feeder.set_memory(95, 100);
        controller.monitor().force_update(0);
        assert!(matches!(
            controller.admit(),
            Err(AdmissionError::PressureCritical)
        ));
    }

    #[test]
    fn test_fail_admission_records_breaker_failure() {
        let (controller, _feeder) = controller();
        let admission = controller.admit().unwrap();
        controller
            .fail_admission(admission.entity_id, "load timeout")
            .unwrap();
        assert_eq!(
            admission.manager.current_state(),
            LifecycleState::Failed
        );
        assert_eq!(controller.breaker().stats().total_failures, 1);
    }

    #[test]
    fn test_unknown_entity_reports_not_found() {
        let (controller, _feeder) = controller();
        assert!(matches!(
            controller.remove(EntityId(999)),
            Err(AdmissionError::EntityNotFound(EntityId(999)))
        ));
    }
}
