/*!
 * Deferred Events
 * World notifications held until their target entity is safe to touch
 */

use crate::core::types::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Kind of world notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Another entity entered or left awareness range
    Proximity,
    /// A direct interaction was requested with this entity
    Interaction,
    /// Shared world state relevant to this entity changed
    WorldUpdate,
    /// A message addressed to this entity
    Message,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Proximity => "proximity",
            Self::Interaction => "interaction",
            Self::WorldUpdate => "world_update",
            Self::Message => "message",
        };
        f.write_str(name)
    }
}

/// A notification that arrived before its target entity went Active
///
/// Owned by the target's `LifecycleManager` while queued, consumed exactly
/// once on drain (or discarded if the entity dies first).
pub enum DeferredEvent {
    /// Generic world notification, dispatched to the drain handler
    Notification {
        kind: EventKind,
        source: EntityId,
        target: EntityId,
        /// Opaque payload owned by whichever collaborator raised the event
        payload: Option<serde_json::Value>,
        raised_at: Instant,
    },
    /// Carries its own handling logic; invoked instead of the drain handler
    Callback {
        name: &'static str,
        run: Box<dyn FnOnce() + Send>,
        raised_at: Instant,
    },
}

impl DeferredEvent {
    /// Create a generic notification event
    #[must_use]
    pub fn notification(kind: EventKind, source: EntityId, target: EntityId) -> Self {
        Self::Notification {
            kind,
            source,
            target,
            payload: None,
            raised_at: Instant::now(),
        }
    }

    /// Attach an opaque payload (notifications only; no-op for callbacks)
    #[must_use]
    pub fn with_payload(mut self, value: serde_json::Value) -> Self {
        if let Self::Notification { payload, .. } = &mut self {
            *payload = Some(value);
        }
        self
    }

    /// Create an event that runs a bound closure when drained
    #[must_use]
    pub fn callback(name: &'static str, run: impl FnOnce() + Send + 'static) -> Self {
        Self::Callback {
            name,
            run: Box::new(run),
            raised_at: Instant::now(),
        }
    }

    /// When the event was raised
    #[inline]
    #[must_use]
    pub fn raised_at(&self) -> Instant {
        match self {
            Self::Notification { raised_at, .. } | Self::Callback { raised_at, .. } => *raised_at,
        }
    }

    /// Short label for logging
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Notification { kind, .. } => match kind {
                EventKind::Proximity => "proximity",
                EventKind::Interaction => "interaction",
                EventKind::WorldUpdate => "world_update",
                EventKind::Message => "message",
            },
            Self::Callback { name, .. } => name,
        }
    }
}

impl fmt::Debug for DeferredEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notification {
                kind,
                source,
                target,
                payload,
                ..
            } => f
                .debug_struct("Notification")
                .field("kind", kind)
                .field("source", source)
                .field("target", target)
                .field("has_payload", &payload.is_some())
                .finish(),
            Self::Callback { name, .. } => {
                f.debug_struct("Callback").field("name", name).finish()
            }
        }
    }
}

/// What happened to an event offered to `queue_event`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// Stored; delivered on the next drain after the entity goes Active
    Queued,
    /// Entity is Active; the caller must process the event immediately
    ProcessNow,
    /// Entity can no longer consume events (or the queue is full); dropped
    Discarded,
}
