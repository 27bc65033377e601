/*!
 * Lifecycle Manager
 *
 * Owns one entity's initialization state machine and its deferred-event
 * queue. Guarantees that no collaborator reads or mutates entity world-data
 * outside the window where that is safe, and that world notifications are
 * never lost even when they arrive too early.
 *
 * # Concurrency
 *
 * - The state lives in a single atomic word; transitions are a validated
 *   compare-and-swap. Competing transitions never both succeed and a failed
 *   attempt never partially mutates state.
 * - History, phase timings, and the event queue sit behind coarse per-manager
 *   locks. The queue-or-not decision reads state under the queue lock, so an
 *   event offered concurrently with activation is either queued (and drained
 *   by the next `process_queued_events`) or told to process now - never both,
 *   never neither.
 */

use crate::core::limits::{MAX_QUEUED_EVENTS, STATE_HISTORY_CAP};
use crate::core::types::EntityId;
use crate::lifecycle::events::{DeferredEvent, QueueOutcome};
use crate::lifecycle::guard::EntityDataGuard;
use crate::lifecycle::types::{
    LifecycleError, LifecycleMetrics, LifecycleResult, LifecycleState, StateTransitionRecord,
};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use time::OffsetDateTime;

/// Diagnostic state kept behind one coarse lock
struct Diagnostics {
    history: VecDeque<StateTransitionRecord>,
    entered_state_at: Instant,
    load_started_at: Option<Instant>,
    init_started_at: Option<Instant>,
    data_load: Option<Duration>,
    manager_init: Option<Duration>,
    time_to_active: Option<Duration>,
    failure_reason: Option<String>,
}

/// Per-entity lifecycle state machine with deferred event delivery
///
/// Created when admission succeeds, destroyed once the entity finishes
/// Removing → Destroyed or is abandoned. Never recycled for another entity.
pub struct LifecycleManager {
    entity_id: EntityId,
    created_at: Instant,
    /// Current state discriminant; all transitions go through a validated
    /// compare-exchange on this word
    state: AtomicU8,
    diag: Mutex<Diagnostics>,
    /// Deferred events; swapped out wholesale on drain so enqueue and drain
    /// never race on the same container
    queue: Mutex<Vec<DeferredEvent>>,
}

impl LifecycleManager {
    /// Create a manager in the Created state
    #[must_use]
    pub fn new(entity_id: EntityId) -> Self {
        debug!("Entity {}: lifecycle manager created", entity_id);
        Self {
            entity_id,
            created_at: Instant::now(),
            state: AtomicU8::new(LifecycleState::Created.as_u8()),
            diag: Mutex::new(Diagnostics {
                history: VecDeque::with_capacity(STATE_HISTORY_CAP),
                entered_state_at: Instant::now(),
                load_started_at: None,
                init_started_at: None,
                data_load: None,
                manager_init: None,
                time_to_active: None,
                failure_reason: None,
            }),
            queue: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Current state, as of the load
    #[inline]
    #[must_use]
    pub fn current_state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Validated, atomic state transition
    ///
    /// Fails without changing anything when the edge is invalid or another
    /// caller moved the state first (first-writer-wins; retry or abort, no
    /// blocking wait).
    pub fn transition_to(&self, next: LifecycleState) -> LifecycleResult<()> {
        let current_raw = self.state.load(Ordering::Acquire);
        let current = LifecycleState::from_u8(current_raw);

        if !current.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        match self.state.compare_exchange(
            current_raw,
            next.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.record_transition(current, next);
                debug!("Entity {}: {} -> {}", self.entity_id, current, next);
                Ok(())
            }
            Err(actual_raw) => Err(LifecycleError::ConcurrentTransition {
                expected: current,
                actual: LifecycleState::from_u8(actual_raw),
            }),
        }
    }

    /// Begin fetching persistent data (Created -> LoadingData)
    pub fn start_data_load(&self) -> LifecycleResult<()> {
        self.transition_to(LifecycleState::LoadingData)?;
        self.diag.lock().load_started_at = Some(Instant::now());
        info!("Entity {}: loading data", self.entity_id);
        Ok(())
    }

    /// Data loaded; begin wiring managers (LoadingData -> Initializing)
    pub fn start_manager_init(&self) -> LifecycleResult<()> {
        self.transition_to(LifecycleState::Initializing)?;
        let mut diag = self.diag.lock();
        diag.data_load = diag.load_started_at.map(|t| t.elapsed());
        diag.init_started_at = Some(Instant::now());
        if let Some(d) = diag.data_load {
            info!(
                "Entity {}: data loaded in {}us, initializing managers",
                self.entity_id,
                d.as_micros()
            );
        }
        Ok(())
    }

    /// Managers wired; entity may be read but is not yet live
    /// (Initializing -> Ready)
    pub fn mark_ready(&self) -> LifecycleResult<()> {
        self.transition_to(LifecycleState::Ready)?;
        let mut diag = self.diag.lock();
        diag.manager_init = diag.init_started_at.map(|t| t.elapsed());
        info!("Entity {}: ready", self.entity_id);
        Ok(())
    }

    /// Entity added to the world; events flow directly from here on
    /// (Ready -> Active)
    ///
    /// Events queued before this point stay queued until the next
    /// `process_queued_events` drain.
    pub fn mark_active(&self) -> LifecycleResult<()> {
        self.transition_to(LifecycleState::Active)?;
        let time_to_active = self.created_at.elapsed();
        self.diag.lock().time_to_active = Some(time_to_active);
        info!(
            "Entity {}: active after {}us ({} deferred events pending)",
            self.entity_id,
            time_to_active.as_micros(),
            self.queue.lock().len()
        );
        Ok(())
    }

    /// Removal begins; queued events are discarded (Active -> Removing)
    pub fn start_removal(&self) -> LifecycleResult<()> {
        self.transition_to(LifecycleState::Removing)?;
        self.discard_queue("removal");
        info!("Entity {}: removing", self.entity_id);
        Ok(())
    }

    /// Cleanup finished (Removing -> Destroyed, or Failed -> Destroyed)
    pub fn mark_destroyed(&self) -> LifecycleResult<()> {
        self.transition_to(LifecycleState::Destroyed)?;
        self.discard_queue("destruction");
        info!("Entity {}: destroyed", self.entity_id);
        Ok(())
    }

    /// Unconditional force to Failed
    ///
    /// The one transition that bypasses the validated table: it always
    /// succeeds, whatever the current state, and records the reason. Queued
    /// events are discarded since the entity can no longer consume them.
    pub fn mark_failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let prev_raw = self
            .state
            .swap(LifecycleState::Failed.as_u8(), Ordering::AcqRel);
        let prev = LifecycleState::from_u8(prev_raw);
        self.record_transition(prev, LifecycleState::Failed);
        self.diag.lock().failure_reason = Some(reason.clone());
        self.discard_queue("failure");
        warn!(
            "Entity {}: forced to failed from {} ({})",
            self.entity_id, prev, reason
        );
    }

    /// Offer a world notification to this entity
    ///
    /// Active entities are never queued for (the caller processes the event
    /// immediately); Removing/Destroyed/Failed entities drop it; everything
    /// else queues FIFO, up to the per-entity bound.
    pub fn queue_event(&self, event: DeferredEvent) -> QueueOutcome {
        let mut queue = self.queue.lock();
        // State is read under the queue lock: the queue-or-not decision and
        // the Active drain cannot interleave
        let state = self.current_state();

        if state.is_active() {
            return QueueOutcome::ProcessNow;
        }
        if !state.can_queue_events() {
            debug!(
                "Entity {}: dropping {} event in state {}",
                self.entity_id,
                event.label(),
                state
            );
            return QueueOutcome::Discarded;
        }
        if queue.len() >= MAX_QUEUED_EVENTS {
            warn!(
                "Entity {}: deferred queue full ({}), dropping {} event",
                self.entity_id,
                MAX_QUEUED_EVENTS,
                event.label()
            );
            return QueueOutcome::Discarded;
        }
        queue.push(event);
        QueueOutcome::Queued
    }

    /// Drain and dispatch all deferred events, in FIFO order
    ///
    /// Only drains while Active; otherwise processes nothing and reports
    /// zero. Callback events invoke their bound closure instead of `handler`.
    /// A panicking handler is caught and logged; the rest of the batch still
    /// runs. Returns the number of events consumed.
    pub fn process_queued_events<F>(&self, mut handler: F) -> usize
    where
        F: FnMut(DeferredEvent),
    {
        let drained: Vec<DeferredEvent> = {
            let mut queue = self.queue.lock();
            if !self.current_state().is_active() {
                return 0;
            }
            std::mem::take(&mut *queue)
        };

        let count = drained.len();
        for event in drained {
            let label = event.label();
            let result = catch_unwind(AssertUnwindSafe(|| match event {
                DeferredEvent::Callback { run, .. } => run(),
                other => handler(other),
            }));
            if result.is_err() {
                error!(
                    "Entity {}: handler for deferred {} event panicked",
                    self.entity_id, label
                );
            }
        }
        if count > 0 {
            debug!("Entity {}: drained {} deferred events", self.entity_id, count);
        }
        count
    }

    /// Request a read-safety token
    ///
    /// Succeeds only while the state is Ready or Active at the instant of
    /// the check. The guard is a permission token, not a lock.
    pub fn try_guard(&self) -> LifecycleResult<EntityDataGuard> {
        let state = self.current_state();
        if state.is_data_safe() {
            Ok(EntityDataGuard::new(self.entity_id, state))
        } else {
            Err(LifecycleError::DataUnsafe(state))
        }
    }

    /// Number of events currently queued
    #[must_use]
    pub fn queued_event_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Time spent in the current state so far
    #[must_use]
    pub fn time_in_state(&self) -> Duration {
        self.diag.lock().entered_state_at.elapsed()
    }

    /// Bounded transition history, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<StateTransitionRecord> {
        self.diag.lock().history.iter().copied().collect()
    }

    /// Failure reason, if the entity was ever force-failed
    #[must_use]
    pub fn failure_reason(&self) -> Option<String> {
        self.diag.lock().failure_reason.clone()
    }

    /// Phase-duration and queue metrics snapshot
    #[must_use]
    pub fn metrics(&self) -> LifecycleMetrics {
        let state = self.current_state();
        let queued_events = self.queue.lock().len();
        let diag = self.diag.lock();
        LifecycleMetrics {
            entity_id: self.entity_id,
            state,
            data_load_micros: diag.data_load.map(|d| d.as_micros() as u64),
            manager_init_micros: diag.manager_init.map(|d| d.as_micros() as u64),
            time_to_active_micros: diag.time_to_active.map(|d| d.as_micros() as u64),
            time_in_state_micros: diag.entered_state_at.elapsed().as_micros() as u64,
            queued_events,
            failed: matches!(state, LifecycleState::Failed),
            failure_reason: diag.failure_reason.clone(),
        }
    }

    /// Append a history record and reset the state-entry clock
    fn record_transition(&self, from: LifecycleState, to: LifecycleState) {
        let mut diag = self.diag.lock();
        if diag.history.len() == STATE_HISTORY_CAP {
            diag.history.pop_front();
        }
        diag.history.push_back(StateTransitionRecord {
            from,
            to,
            at: OffsetDateTime::now_utc(),
        });
        diag.entered_state_at = Instant::now();
    }

    /// Drop any still-queued events; the entity can no longer consume them
    fn discard_queue(&self, cause: &str) {
        let dropped = std::mem::take(&mut *self.queue.lock());
        if !dropped.is_empty() {
            debug!(
                "Entity {}: discarded {} deferred events on {}",
                self.entity_id,
                dropped.len(),
                cause
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::events::EventKind;

    fn manager() -> LifecycleManager {
        LifecycleManager::new(EntityId(1))
    }

    fn activated() -> LifecycleManager {
        let m = manager();
        m.start_data_load().unwrap();
        m.start_manager_init().unwrap();
        m.mark_ready().unwrap();
        m.mark_active().unwrap();
        m
    }

    #[test]
    fn test_happy_path_chain() {
        let m = activated();
        assert_eq!(m.current_state(), LifecycleState::Active);
        m.start_removal().unwrap();
        m.mark_destroyed().unwrap();
        assert_eq!(m.current_state(), LifecycleState::Destroyed);
    }

    #[test]
    fn test_invalid_transition_leaves_state_unchanged() {
        let m = manager();
        let err = m.transition_to(LifecycleState::Ready).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: LifecycleState::Created,
                to: LifecycleState::Ready,
            }
        );
        assert_eq!(m.current_state(), LifecycleState::Created);
    }

    #[test]
    fn test_mark_failed_is_unconditional() {
        let m = activated();
        m.mark_failed("world desync");
        assert_eq!(m.current_state(), LifecycleState::Failed);
        assert_eq!(m.failure_reason().as_deref(), Some("world desync"));
        // Failed may only proceed to Destroyed
        assert!(m.transition_to(LifecycleState::Active).is_err());
        m.mark_destroyed().unwrap();
    }

    #[test]
    fn test_events_queue_before_active_and_drain_fifo() {
        let m = manager();
        for i in 0..3 {
            let outcome = m.queue_event(
                DeferredEvent::notification(EventKind::Proximity, EntityId(100 + i), EntityId(1)),
            );
            assert_eq!(outcome, QueueOutcome::Queued);
        }
        // Not active yet: drain is a no-op
        assert_eq!(m.process_queued_events(|_| {}), 0);
        assert_eq!(m.queued_event_count(), 3);

        m.start_data_load().unwrap();
        m.start_manager_init().unwrap();
        m.mark_ready().unwrap();
        m.mark_active().unwrap();

        let mut sources = Vec::new();
        let drained = m.process_queued_events(|event| {
            if let DeferredEvent::Notification { source, .. } = event {
                sources.push(source.0);
            }
        });
        assert_eq!(drained, 3);
        assert_eq!(sources, vec![100, 101, 102]);
        assert_eq!(m.queued_event_count(), 0);
    }

    #[test]
    fn test_active_entities_process_immediately() {
        let m = activated();
        let outcome = m.queue_event(DeferredEvent::notification(
            EventKind::Message,
            EntityId(2),
            EntityId(1),
        ));
        assert_eq!(outcome, QueueOutcome::ProcessNow);
        assert_eq!(m.queued_event_count(), 0);
    }

    #[test]
    fn test_terminal_states_discard_events() {
        let m = activated();
        m.start_removal().unwrap();
        let outcome = m.queue_event(DeferredEvent::notification(
            EventKind::WorldUpdate,
            EntityId(2),
            EntityId(1),
        ));
        assert_eq!(outcome, QueueOutcome::Discarded);
    }

    #[test]
    fn test_callback_event_runs_bound_closure() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let m = manager();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        m.queue_event(DeferredEvent::callback("late-bind", move || {
            flag.store(true, Ordering::SeqCst);
        }));

        m.start_data_load().unwrap();
        m.start_manager_init().unwrap();
        m.mark_ready().unwrap();
        m.mark_active().unwrap();

        let drained = m.process_queued_events(|_| panic!("generic handler must not run"));
        assert_eq!(drained, 1);
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_panicking_handler_does_not_abort_batch() {
        let m = manager();
        for _ in 0..3 {
            m.queue_event(DeferredEvent::notification(
                EventKind::Interaction,
                EntityId(2),
                EntityId(1),
            ));
        }
        m.start_data_load().unwrap();
        m.start_manager_init().unwrap();
        m.mark_ready().unwrap();
        m.mark_active().unwrap();

        let mut handled = 0;
        let drained = m.process_queued_events(|_| {
            handled += 1;
            if handled == 1 {
                panic!("boom");
            }
        });
        assert_eq!(drained, 3);
        assert_eq!(handled, 3);
    }

    #[test]
    fn test_history_is_bounded() {
        let m = manager();
        // Alternate forced failure and destruction; both always succeed
        m.mark_failed("seed");
        for _ in 0..7 {
            m.mark_destroyed().unwrap();
            m.mark_failed("again");
        }
        let history = m.history();
        assert_eq!(history.len(), STATE_HISTORY_CAP);
        // Oldest entries were evicted first
        assert_eq!(history.last().unwrap().to, LifecycleState::Failed);
    }

    #[test]
    fn test_guard_only_in_safe_states() {
        let m = manager();
        assert!(m.try_guard().is_err());
        m.start_data_load().unwrap();
        assert!(m.try_guard().is_err());
        m.start_manager_init().unwrap();
        m.mark_ready().unwrap();
        assert!(m.try_guard().is_ok());
        m.mark_active().unwrap();
        let guard = m.try_guard().unwrap();
        assert_eq!(guard.observed_state(), LifecycleState::Active);
    }

    #[test]
    fn test_metrics_capture_phase_durations() {
        let m = activated();
        let metrics = m.metrics();
        assert_eq!(metrics.state, LifecycleState::Active);
        assert!(metrics.data_load_micros.is_some());
        assert!(metrics.manager_init_micros.is_some());
        assert!(metrics.time_to_active_micros.is_some());
        assert!(!metrics.failed);
    }
}
