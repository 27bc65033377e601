/*!
 * Entity Data Guard
 *
 * Scoped read-safety token. A guard records that the entity was in a
 * data-safe state (Ready or Active) at the instant of the check; it confers
 * no mutual exclusion and holds no lock.
 */

use crate::core::types::EntityId;
use crate::lifecycle::types::LifecycleState;
use std::time::{Duration, Instant};

/// Permission token minted by `LifecycleManager::try_guard`
#[derive(Debug, Clone)]
pub struct EntityDataGuard {
    entity_id: EntityId,
    observed: LifecycleState,
    minted_at: Instant,
}

impl EntityDataGuard {
    pub(crate) fn new(entity_id: EntityId, observed: LifecycleState) -> Self {
        debug_assert!(observed.is_data_safe());
        Self {
            entity_id,
            observed,
            minted_at: Instant::now(),
        }
    }

    /// Entity this guard was minted for
    #[inline]
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// State observed when the guard was minted
    #[inline]
    #[must_use]
    pub fn observed_state(&self) -> LifecycleState {
        self.observed
    }

    /// How long ago the safety check happened
    #[must_use]
    pub fn age(&self) -> Duration {
        self.minted_at.elapsed()
    }
}
