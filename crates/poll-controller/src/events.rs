//! Room event vocabulary.
//!
//! These are the events fanned out to session-room members by the
//! [`crate::bus::RoomBus`]. The serialized shape (tag names and payloads) is
//! the outward contract consumed by the excluded transport layer, so the
//! wire names use the kebab-case event names clients listen for.

use common::entities::Poll;
use common::types::PollId;
use serde::{Deserialize, Serialize};

/// An event published to every live connection in a session room.
///
/// Delivery is at-most-once and best-effort: connections that are not room
/// members at publish time never see the event, and there is no replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum RoomEvent {
    /// Current room occupancy, published on every join and leave.
    ParticipantCount(usize),
    /// A poll was launched and is accepting votes.
    PollLaunched(PollId),
    /// A poll stopped accepting votes (timer expiry, explicit close, or
    /// supersession by a newer launch).
    PollClosed(PollId),
    /// Tallies changed; carries the full poll snapshot for display.
    ResultsUpdated(Box<Poll>),
    /// A new draft poll is available to the room.
    NewPoll(Box<Poll>),
}

impl RoomEvent {
    /// The wire-level event name, as clients subscribe to it.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::ParticipantCount(_) => "participant-count",
            RoomEvent::PollLaunched(_) => "poll-launched",
            RoomEvent::PollClosed(_) => "poll-closed",
            RoomEvent::ResultsUpdated(_) => "results-updated",
            RoomEvent::NewPoll(_) => "new-poll",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_match_wire_tags() {
        let event = RoomEvent::ParticipantCount(3);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "participant-count");
        assert_eq!(json["payload"], 3);
        assert_eq!(event.name(), "participant-count");
    }

    #[test]
    fn test_poll_closed_payload_is_poll_id() {
        let id = PollId::new();
        let json = serde_json::to_value(RoomEvent::PollClosed(id)).unwrap();
        assert_eq!(json["event"], "poll-closed");
        assert_eq!(json["payload"], serde_json::to_value(id).unwrap());
    }
}
