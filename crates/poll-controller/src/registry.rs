//! Session registry: room membership for live connections.
//!
//! Tracks which connections currently belong to which session room, keyed by
//! session code. Membership is ephemeral by design: it exists only for the
//! lifetime of the connections, and a process restart loses presence but not
//! persisted session/poll/vote data.
//!
//! The registry is an owned instance constructed at startup and injected
//! wherever it is needed; nothing reaches it through ambient global state.
//! Its internal map is guarded by a plain `Mutex` that is only held for map
//! operations, never across an `.await`.

use crate::events::RoomEvent;
use common::types::ConnectionId;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Per-room membership: connection ID to its event sender.
type Room = HashMap<ConnectionId, mpsc::Sender<RoomEvent>>;

/// In-memory, process-local room membership map.
#[derive(Default)]
pub struct SessionRegistry {
    rooms: Mutex<HashMap<String, Room>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room if absent.
    ///
    /// Idempotent: re-joining replaces the stored sender and does not change
    /// the occupancy count. Returns the room's new occupancy.
    pub fn join(
        &self,
        session_code: &str,
        connection_id: ConnectionId,
        sender: mpsc::Sender<RoomEvent>,
    ) -> usize {
        let mut rooms = match self.rooms.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let room = rooms.entry(session_code.to_string()).or_default();
        room.insert(connection_id, sender);
        let occupancy = room.len();

        debug!(
            target: "pc.registry",
            session_code = %session_code,
            connection_id = %connection_id,
            occupancy,
            "Connection joined room"
        );

        occupancy
    }

    /// Remove a connection from whatever room(s) it belongs to.
    ///
    /// Safe no-op for unknown connection IDs. Rooms left empty are deleted.
    /// Returns each affected room with its new occupancy.
    pub fn leave(&self, connection_id: ConnectionId) -> Vec<(String, usize)> {
        let mut rooms = match self.rooms.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut affected = Vec::new();
        rooms.retain(|code, room| {
            if room.remove(&connection_id).is_some() {
                affected.push((code.clone(), room.len()));
            }
            !room.is_empty()
        });

        for (code, occupancy) in &affected {
            debug!(
                target: "pc.registry",
                session_code = %code,
                connection_id = %connection_id,
                occupancy,
                "Connection left room"
            );
        }

        affected
    }

    /// Current occupancy of a room; 0 for unknown codes.
    #[must_use]
    pub fn occupancy(&self, session_code: &str) -> usize {
        let rooms = match self.rooms.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rooms.get(session_code).map_or(0, Room::len)
    }

    /// Snapshot the senders of a room's current members.
    ///
    /// Cloned out under the lock so fan-out happens without holding it.
    #[must_use]
    pub fn senders(&self, session_code: &str) -> Vec<mpsc::Sender<RoomEvent>> {
        let rooms = match self.rooms.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rooms
            .get(session_code)
            .map(|room| room.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of rooms with at least one member.
    #[must_use]
    pub fn room_count(&self) -> usize {
        let rooms = match self.rooms.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rooms.len()
    }

    /// Total connections registered across all rooms.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        let rooms = match self.rooms.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rooms.values().map(Room::len).sum()
    }
}
