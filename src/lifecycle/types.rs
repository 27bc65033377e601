/*!
 * Lifecycle Types
 * State enum, transition records, and per-entity metrics
 */

use crate::core::types::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;

/// Lifecycle operation result
///
/// # Must Use
/// A rejected transition leaves the state unchanged; callers must decide
/// whether to retry, abandon, or force a failure
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LifecycleError {
    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("State changed concurrently: expected {expected:?}, found {actual:?}")]
    ConcurrentTransition {
        expected: LifecycleState,
        actual: LifecycleState,
    },

    #[error("Entity data is not safe to read in state {0:?}")]
    DataUnsafe(LifecycleState),
}

/// Entity lifecycle state
///
/// Strictly ordered except `Failed`, which any live state can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LifecycleState {
    /// Entity structure exists; nothing has been loaded yet
    Created = 0,
    /// Persistent data is being fetched
    LoadingData = 1,
    /// Per-entity managers are being wired up
    Initializing = 2,
    /// Fully initialized, not yet visible to the world
    Ready = 3,
    /// Live in the world; managers run and events are delivered
    Active = 4,
    /// Removal in progress; no new events accepted
    Removing = 5,
    /// Gone; terminal
    Destroyed = 6,
    /// Unrecoverable error; may only proceed to Destroyed
    Failed = 7,
}

/// Every state, in discriminant order (useful for exhaustive tests)
pub const ALL_STATES: [LifecycleState; 8] = [
    LifecycleState::Created,
    LifecycleState::LoadingData,
    LifecycleState::Initializing,
    LifecycleState::Ready,
    LifecycleState::Active,
    LifecycleState::Removing,
    LifecycleState::Destroyed,
    LifecycleState::Failed,
];

impl LifecycleState {
    /// Reconstruct from the atomic state word
    ///
    /// Only discriminants produced by `as_u8` are ever stored
    #[inline]
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::LoadingData,
            2 => Self::Initializing,
            3 => Self::Ready,
            4 => Self::Active,
            5 => Self::Removing,
            6 => Self::Destroyed,
            7 => Self::Failed,
            _ => unreachable!(),
        }
    }

    #[inline]
    pub(crate) const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check whether entity world-data may be read
    ///
    /// # Performance
    /// Hot path - checked on every guard request and data access
    #[inline(always)]
    #[must_use]
    pub const fn is_data_safe(self) -> bool {
        matches!(self, Self::Ready | Self::Active)
    }

    /// Check whether per-entity managers may run
    #[inline(always)]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check whether this state can never be left
    #[inline(always)]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Destroyed)
    }

    /// Check whether arriving events may still be queued for later delivery
    ///
    /// Active entities process immediately; Removing/Destroyed/Failed
    /// entities have no way to consume an event
    #[inline(always)]
    #[must_use]
    pub const fn can_queue_events(self) -> bool {
        matches!(
            self,
            Self::Created | Self::LoadingData | Self::Initializing | Self::Ready
        )
    }

    /// Validated transition table
    ///
    /// The chain edges, plus `* -> Failed` for every live state and
    /// `Failed -> Destroyed`. Everything else is rejected.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::LoadingData)
                | (Self::LoadingData, Self::Initializing)
                | (Self::Initializing, Self::Ready)
                | (Self::Ready, Self::Active)
                | (Self::Active, Self::Removing)
                | (Self::Removing, Self::Destroyed)
                | (Self::Failed, Self::Destroyed)
                | (Self::Created, Self::Failed)
                | (Self::LoadingData, Self::Failed)
                | (Self::Initializing, Self::Failed)
                | (Self::Ready, Self::Failed)
                | (Self::Active, Self::Failed)
                | (Self::Removing, Self::Failed)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::LoadingData => "loading_data",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Removing => "removing",
            Self::Destroyed => "destroyed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One successful state transition, kept for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StateTransitionRecord {
    pub from: LifecycleState,
    pub to: LifecycleState,
    #[serde(with = "time::serde::timestamp")]
    pub at: OffsetDateTime,
}

/// Per-entity lifecycle metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LifecycleMetrics {
    pub entity_id: EntityId,
    pub state: LifecycleState,
    /// Duration of the LoadingData phase, once complete
    pub data_load_micros: Option<u64>,
    /// Duration of the Initializing phase, once complete
    pub manager_init_micros: Option<u64>,
    /// Creation-to-Active latency, once active
    pub time_to_active_micros: Option<u64>,
    /// How long the entity has sat in its current state
    pub time_in_state_micros: u64,
    pub queued_events: usize,
    pub failed: bool,
    pub failure_reason: Option<String>,
}
