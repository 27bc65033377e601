/*!
 * Entity Lifecycle
 * Per-entity initialization state machine with deferred event delivery
 *
 * # Architecture
 *
 * - **Strict phases**: Created → LoadingData → Initializing → Ready → Active
 *   → Removing → Destroyed, with Failed as the out-of-band escape hatch
 * - **Atomic transitions**: validated compare-and-swap on a single state
 *   word; first writer wins, losers get an error and decide what to do
 * - **Deferred events**: world notifications that arrive before Active are
 *   queued and drained in FIFO order once the entity is live
 */

pub mod events;
pub mod guard;
pub mod manager;
pub mod types;

pub use events::{DeferredEvent, EventKind, QueueOutcome};
pub use guard::EntityDataGuard;
pub use manager::LifecycleManager;
pub use types::{
    LifecycleError, LifecycleMetrics, LifecycleResult, LifecycleState, StateTransitionRecord,
    ALL_STATES,
};
