/*!
 * Swarm Kernel Library
 * Admission and lifecycle control plane for simulated entities
 */

pub mod admission;
pub mod core;
pub mod lifecycle;
pub mod monitoring;
pub mod session;

// Re-exports
pub use admission::{
    Admission, AdmissionController, AdmissionControllerBuilder, BreakerState, BreakerStats,
    ControlTask, SpawnCircuitBreaker,
};
pub use crate::core::config::KernelConfig;
pub use crate::core::errors::{AdmissionError, AdmissionResult, ConfigError};
pub use crate::core::types::{EntityId, EntityIdGenerator, SessionId};
pub use lifecycle::{
    DeferredEvent, EntityDataGuard, EventKind, LifecycleError, LifecycleManager, LifecycleMetrics,
    LifecycleState, QueueOutcome, StateTransitionRecord,
};
pub use monitoring::{
    init_tracing, MetricsSource, NullWorld, PressureLevel, ResourceMetrics, ResourceMonitor,
    SyntheticSource, WorldCollaborator,
};
pub use session::{PoolStats, Session, SessionHandle, SessionPool};
