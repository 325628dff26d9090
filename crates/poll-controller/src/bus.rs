//! Broadcast bus: room-scoped event fan-out.
//!
//! Publishes lifecycle and tally events to every current member of a session
//! room. Delivery is at-most-once and best-effort: a full or closed
//! per-connection channel drops that one delivery without affecting the
//! others, and a publish never fails or rolls back the state transition that
//! triggered it.

use crate::actors::metrics::ControllerMetrics;
use crate::events::RoomEvent;
use crate::registry::SessionRegistry;
use common::types::ConnectionId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Room-scoped publisher over the session registry's membership.
#[derive(Clone)]
pub struct RoomBus {
    registry: Arc<SessionRegistry>,
    metrics: Arc<ControllerMetrics>,
}

impl RoomBus {
    /// Create a bus over the given registry.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, metrics: Arc<ControllerMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// The registry backing this bus.
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Publish an event to all current members of a room.
    ///
    /// Non-blocking: uses `try_send` per connection so a slow consumer can
    /// never stall the state machine. Per-connection failures are logged
    /// and swallowed.
    pub fn publish(&self, session_code: &str, event: &RoomEvent) {
        let senders = self.registry.senders(session_code);
        let mut delivered = 0usize;
        let mut dropped = 0usize;

        for sender in &senders {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => dropped += 1,
            }
        }

        metrics::counter!("pc_events_published_total", "event" => event.name())
            .increment(1);
        if dropped > 0 {
            metrics::counter!("pc_events_dropped_total", "event" => event.name())
                .increment(dropped as u64);
        }

        debug!(
            target: "pc.bus",
            session_code = %session_code,
            event = event.name(),
            delivered,
            dropped,
            "Published room event"
        );
    }

    /// Register a connection in a room and publish the updated occupancy.
    ///
    /// Returns the new occupancy count. Re-joining a room the connection is
    /// already in is a no-op and does not move the connection gauge.
    pub fn join_room(
        &self,
        session_code: &str,
        connection_id: ConnectionId,
        sender: mpsc::Sender<RoomEvent>,
    ) -> usize {
        let before = self.registry.occupancy(session_code);
        let occupancy = self.registry.join(session_code, connection_id, sender);
        if occupancy > before {
            self.metrics.increment_connections();
        }
        self.publish(session_code, &RoomEvent::ParticipantCount(occupancy));
        occupancy
    }

    /// Remove a connection from its room and publish updated occupancy to
    /// each room it left. Called on explicit leave and on connection
    /// teardown; safe for unknown connection IDs.
    pub fn leave_room(&self, connection_id: ConnectionId) {
        for (session_code, occupancy) in self.registry.leave(connection_id) {
            self.metrics.decrement_connections();
            self.publish(&session_code, &RoomEvent::ParticipantCount(occupancy));
        }
    }
}
