//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`BusEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use bench_core::cache::BenchCacheUpdate;
use bench_core::protocol::{ChangeKind, Entity};
use bench_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BusEvent
// ---------------------------------------------------------------------------

/// An event broadcast to every observer.
///
/// Serialized with an `event` tag, e.g.
/// `{"event": "entity-cache-update", "entity": "resource", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum BusEvent {
    /// Merged ephemeral-state delta for one bench.
    #[serde(rename_all = "camelCase")]
    EntityCacheUpdate {
        entity: Entity,
        resource_id: DbId,
        changed_fields: BenchCacheUpdate,
    },

    /// A bench or user was created, updated or removed.
    #[serde(rename_all = "camelCase")]
    EntityChanged {
        entity: Entity,
        change_kind: ChangeKind,
        data: serde_json::Value,
    },

    /// Liveness tick for observers.
    Heartbeat { timestamp: Timestamp },
}

impl BusEvent {
    /// Wrap a merged bench delta.
    pub fn cache_update(update: BenchCacheUpdate) -> Self {
        BusEvent::EntityCacheUpdate {
            entity: Entity::Bench,
            resource_id: update.id,
            changed_fields: update,
        }
    }

    /// Announce the effect of a CRUD command.
    pub fn entity_changed(entity: Entity, change_kind: ChangeKind, data: serde_json::Value) -> Self {
        BusEvent::EntityChanged {
            entity,
            change_kind,
            data,
        }
    }

    pub fn heartbeat() -> Self {
        BusEvent::Heartbeat {
            timestamp: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`BusEvent`].
///
/// # Usage
///
/// ```rust
/// use bench_events::bus::{BusEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(BusEvent::heartbeat());
/// ```
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: BusEvent) {
        // Ignore the SendError, it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
