/*!
 * Session Pool
 *
 * Amortizes session construction cost by reuse, under bounded memory.
 * One coarse lock guards the pooled queue and the active map; statistics
 * live on atomics so readers never block the mutating path.
 */

use crate::core::config::PoolConfig;
use crate::core::types::EntityId;
use crate::session::types::{PoolStats, Session};
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared handle to an acquired session
///
/// The pool keeps one clone in its active map so the session can be
/// reclaimed by entity id; pooling on release requires the handle to be the
/// last one standing.
pub type SessionHandle = Arc<Mutex<Session>>;

struct PoolInner {
    pooled: VecDeque<Session>,
    active: HashMap<EntityId, SessionHandle, ahash::RandomState>,
    last_cleanup_at: Instant,
}

/// Bounded reuse pool for per-entity sessions
pub struct SessionPool {
    config: PoolConfig,
    inner: Mutex<PoolInner>,
    created: AtomicU64,
    reused: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    active_count: AtomicUsize,
    pooled_count: AtomicUsize,
}

impl SessionPool {
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(PoolInner {
                pooled: VecDeque::new(),
                active: HashMap::default(),
                last_cleanup_at: Instant::now(),
            }),
            created: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            active_count: AtomicUsize::new(0),
            pooled_count: AtomicUsize::new(0),
        }
    }

    /// Pre-populate the pool with generic, identity-free sessions
    pub fn initialize(&self) {
        let mut inner = self.inner.lock();
        let target = self.config.initial_size.min(self.config.max_size);
        while inner.pooled.len() < target {
            inner.pooled.push_back(Session::new());
            self.created.fetch_add(1, Ordering::Relaxed);
        }
        self.pooled_count.store(inner.pooled.len(), Ordering::Relaxed);
        info!("Session pool initialized with {} sessions", inner.pooled.len());
    }

    /// Obtain a session bound to `entity`
    ///
    /// Pops one pooled session when available: reusable counts as a hit,
    /// otherwise it is discarded and a fresh session constructed. Every
    /// acquired session is recorded as active regardless of origin.
    pub fn acquire(&self, entity: EntityId) -> SessionHandle {
        let max_age = self.config.session_max_age();
        let mut inner = self.inner.lock();

        let mut session = match inner.pooled.pop_front() {
            Some(pooled) if pooled.is_reusable(max_age) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.reused.fetch_add(1, Ordering::Relaxed);
                pooled
            }
            stale => {
                if stale.is_some() {
                    debug!("Discarding non-reusable pooled session for {}", entity);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.created.fetch_add(1, Ordering::Relaxed);
                Session::new()
            }
        };
        session.bind(entity);

        let handle = Arc::new(Mutex::new(session));
        inner.active.insert(entity, Arc::clone(&handle));
        self.sync_counts(&inner);
        handle
    }

    /// Give a session back by handle
    ///
    /// Returns it to the pool only while under the size ceiling and passing
    /// the reusability check; otherwise the session is dropped. A handle
    /// still shared elsewhere cannot be pooled and is likewise left to die.
    pub fn release(&self, handle: SessionHandle) {
        let bound = handle.lock().bound_entity();
        let mut inner = self.inner.lock();
        if let Some(entity) = bound {
            let matches = inner
                .active
                .get(&entity)
                .is_some_and(|active| Arc::ptr_eq(active, &handle));
            if matches {
                inner.active.remove(&entity);
            }
        }
        self.repool(&mut inner, handle);
        self.sync_counts(&inner);
    }

    /// Reclaim by entity id, for callers that no longer hold the handle
    ///
    /// Returns whether an active session was found for the entity.
    pub fn return_session(&self, entity: EntityId) -> bool {
        let mut inner = self.inner.lock();
        let Some(handle) = inner.active.remove(&entity) else {
            return false;
        };
        self.repool(&mut inner, handle);
        self.sync_counts(&inner);
        true
    }

    /// Periodic cleanup, time-gated
    ///
    /// Evicts leading non-reusable pooled sessions while the pool exceeds
    /// its floor, stopping at the first reusable entry. Only a prefix scan:
    /// bounded work per tick rather than full re-validation.
    pub fn tick(&self) {
        let mut inner = self.inner.lock();
        if inner.last_cleanup_at.elapsed() < self.config.cleanup_interval() {
            return;
        }
        inner.last_cleanup_at = Instant::now();

        let max_age = self.config.session_max_age();
        let mut evicted = 0usize;
        while inner.pooled.len() > self.config.min_size {
            match inner.pooled.front() {
                Some(front) if !front.is_reusable(max_age) => {
                    inner.pooled.pop_front();
                    evicted += 1;
                }
                _ => break,
            }
        }
        if evicted > 0 {
            debug!("Session pool cleanup evicted {} stale sessions", evicted);
            self.sync_counts(&inner);
        }
    }

    /// Statistics snapshot, read entirely from atomics
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let created = self.created.load(Ordering::Relaxed);
        let reused = self.reused.load(Ordering::Relaxed);
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let attempts = hits + misses;
        let obtained = created + reused;
        PoolStats {
            created,
            reused,
            active: self.active_count.load(Ordering::Relaxed),
            pooled: self.pooled_count.load(Ordering::Relaxed),
            hits,
            misses,
            hit_rate_pct: if attempts == 0 {
                0.0
            } else {
                hits as f64 / attempts as f64 * 100.0
            },
            reuse_rate_pct: if obtained == 0 {
                0.0
            } else {
                reused as f64 / obtained as f64 * 100.0
            },
        }
    }

    /// Return a handle's session to the pool if it qualifies
    fn repool(&self, inner: &mut PoolInner, handle: SessionHandle) {
        match Arc::try_unwrap(handle) {
            Ok(mutex) => {
                let mut session = mutex.into_inner();
                if inner.pooled.len() < self.config.max_size
                    && session.is_reusable(self.config.session_max_age())
                {
                    session.unbind();
                    inner.pooled.push_back(session);
                } else {
                    debug!("Dropping session {} instead of pooling", session.id());
                }
            }
            // Never lock the session here: the pool lock is held, and a
            // holder of the surviving handle may be waiting on the pool
            Err(_shared) => {
                debug!("Session still shared; left for normal destruction");
            }
        }
    }

    fn sync_counts(&self, inner: &PoolInner) {
        self.active_count.store(inner.active.len(), Ordering::Relaxed);
        self.pooled_count.store(inner.pooled.len(), Ordering::Relaxed);
    }
}
