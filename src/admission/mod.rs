/*!
 * Admission Control
 * Gates the entry of new entities into the shared host process
 *
 * The admission path runs, in order: resource pressure gate, spawn-rate
 * throttle, circuit breaker, session acquisition, lifecycle manager
 * creation. The circuit breaker halts bulk admission when the recent
 * failure rate is too high and probes recovery gradually.
 */

pub mod breaker;
pub mod controller;
pub mod task;
pub mod types;

pub use breaker::SpawnCircuitBreaker;
pub use controller::{Admission, AdmissionController, AdmissionControllerBuilder};
pub use task::{ControlCommand, ControlTask};
pub use types::{BreakerState, BreakerStats};
