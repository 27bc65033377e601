/*!
 * Session Types
 * The pooled per-entity session object and pool statistics
 */

use crate::core::limits::{SESSION_BUFFER_BLOAT_LIMIT, SESSION_BUFFER_CAPACITY};
use crate::core::types::{EntityId, SessionId};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Expensive per-entity connection/context object
///
/// Construction reserves the I/O buffers; reuse keeps their capacity while
/// clearing contents. While pooled the session belongs to the pool; once
/// acquired it belongs to the admission layer until released or reclaimed
/// by entity id.
pub struct Session {
    id: SessionId,
    /// Bumped on every bind, so stale references are detectable
    generation: u64,
    bound_to: Option<EntityId>,
    created_at: Instant,
    last_used_at: Instant,
    send_buf: Vec<u8>,
    recv_buf: Vec<u8>,
    poisoned: bool,
}

impl Session {
    /// Construct a generic session, not yet bound to an identity
    #[must_use]
    pub(crate) fn new() -> Self {
        let now = Instant::now();
        Self {
            id: uuid::Uuid::new_v4(),
            generation: 0,
            bound_to: None,
            created_at: now,
            last_used_at: now,
            send_buf: Vec::with_capacity(SESSION_BUFFER_CAPACITY),
            recv_buf: Vec::with_capacity(SESSION_BUFFER_CAPACITY),
            poisoned: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    #[must_use]
    pub fn bound_entity(&self) -> Option<EntityId> {
        self.bound_to
    }

    /// Hand the session to an entity
    pub(crate) fn bind(&mut self, entity: EntityId) {
        self.bound_to = Some(entity);
        self.last_used_at = Instant::now();
        self.generation += 1;
    }

    /// Detach and scrub for pooling; buffer capacity is kept
    pub(crate) fn unbind(&mut self) {
        self.bound_to = None;
        self.send_buf.clear();
        self.recv_buf.clear();
        self.last_used_at = Instant::now();
    }

    /// Mark the session unusable (protocol violation, stream corruption)
    pub fn poison(&mut self) {
        self.poisoned = true;
    }

    #[inline]
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since the session last moved data or changed hands
    #[must_use]
    pub fn idle_time(&self) -> Duration {
        self.last_used_at.elapsed()
    }

    /// Reusability check applied on acquire, release, and cleanup
    #[must_use]
    pub fn is_reusable(&self, max_age: Duration) -> bool {
        !self.poisoned
            && self.created_at.elapsed() < max_age
            && self.send_buf.capacity() <= SESSION_BUFFER_BLOAT_LIMIT
            && self.recv_buf.capacity() <= SESSION_BUFFER_BLOAT_LIMIT
    }

    /// Outbound buffer
    pub fn send_buffer(&mut self) -> &mut Vec<u8> {
        self.last_used_at = Instant::now();
        &mut self.send_buf
    }

    /// Inbound buffer
    pub fn recv_buffer(&mut self) -> &mut Vec<u8> {
        self.last_used_at = Instant::now();
        &mut self.recv_buf
    }
}

/// Pool statistics snapshot
///
/// Monotonic counters read without blocking the mutating path; no strict
/// consistency with pool contents is guaranteed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PoolStats {
    pub created: u64,
    pub reused: u64,
    pub active: usize,
    pub pooled: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate_pct: f64,
    pub reuse_rate_pct: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_is_reusable() {
        let session = Session::new();
        assert!(session.is_reusable(Duration::from_secs(60)));
        assert!(session.bound_entity().is_none());
    }

    #[test]
    fn test_poisoned_session_is_not_reusable() {
        let mut session = Session::new();
        session.poison();
        assert!(!session.is_reusable(Duration::from_secs(60)));
    }

    #[test]
    fn test_bind_bumps_generation() {
        let mut session = Session::new();
        session.bind(EntityId(1));
        session.unbind();
        session.bind(EntityId(2));
        assert_eq!(session.generation(), 2);
        assert_eq!(session.bound_entity(), Some(EntityId(2)));
    }

    #[test]
    fn test_unbind_clears_but_keeps_capacity() {
        let mut session = Session::new();
        session.bind(EntityId(1));
        session.send_buffer().extend_from_slice(b"world state burst");
        let cap = session.send_buffer().capacity();
        session.unbind();
        assert!(session.send_buffer().is_empty());
        assert_eq!(session.send_buffer().capacity(), cap);
    }

    #[test]
    fn test_bloated_buffers_block_reuse() {
        let mut session = Session::new();
        session
            .send_buffer()
            .reserve(SESSION_BUFFER_BLOAT_LIMIT + 1);
        assert!(!session.is_reusable(Duration::from_secs(60)));
    }
}
