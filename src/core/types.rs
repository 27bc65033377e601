/*!
 * Core Types
 * Common types used across the control plane
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Entity identifier
///
/// Opaque and unique within one host process; stable for the whole life of
/// the managed entity. Used as the key for all per-entity maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session identifier
pub type SessionId = uuid::Uuid;

/// Atomic entity id generator
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - Lock-free atomic operations
#[repr(C, align(64))]
pub struct EntityIdGenerator {
    counter: AtomicU64,
}

impl EntityIdGenerator {
    /// Create a generator starting at id 1 (0 is reserved as a sentinel)
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    /// Generate the next entity id
    #[inline]
    pub fn next(&self) -> EntityId {
        EntityId(self.counter.fetch_add(1, Ordering::Relaxed))
    }

    /// Get current counter value (for debugging)
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for EntityIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
