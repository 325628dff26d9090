//! Message types for actor communication.
//!
//! All inter-actor communication uses strongly-typed message passing via
//! `tokio::sync::mpsc`. Response patterns use `tokio::sync::oneshot` for
//! request-reply semantics.

use crate::actors::session::SessionHandle;
use crate::errors::PcError;
use crate::events::RoomEvent;
use common::entities::{Poll, Session, Vote};
use common::types::{ConnectionId, PollId, SessionId, UserId};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Messages sent to `PollControllerActor`.
#[derive(Debug)]
pub enum ControllerMessage {
    /// Open a new session: allocate a code, persist the record, spawn a
    /// session actor.
    OpenSession {
        owner_id: UserId,
        title: String,
        /// Response channel for the persisted session or error.
        respond_to: oneshot::Sender<Result<Session, PcError>>,
    },

    /// Resolve a session actor handle by join code.
    ResolveSession {
        session_code: String,
        /// Response channel for the session actor handle or error.
        respond_to: oneshot::Sender<Result<SessionHandle, PcError>>,
    },

    /// Resolve the session actor that owns a poll (for poll-keyed operations
    /// such as launch and close).
    ResolvePoll {
        poll_id: PollId,
        /// Response channel for the session actor handle or error.
        respond_to: oneshot::Sender<Result<SessionHandle, PcError>>,
    },

    /// List every session a user has owned, for the owner's history view.
    OwnerHistory {
        owner_id: UserId,
        /// Response channel for the owned sessions in creation order.
        respond_to: oneshot::Sender<Result<Vec<Session>, PcError>>,
    },

    /// Remove a session actor (called after the session ends).
    RemoveSession {
        session_id: SessionId,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), PcError>>,
    },

    /// Get current status of all sessions (for health checks).
    GetStatus {
        /// Response channel for controller status.
        respond_to: oneshot::Sender<ControllerStatus>,
    },

    /// Initiate graceful shutdown (SIGTERM received).
    Shutdown {
        /// Deadline for shutdown.
        deadline: Duration,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), PcError>>,
    },
}

/// Messages sent to `SessionActor`.
#[derive(Debug)]
pub enum SessionMessage {
    /// Create a draft poll in this session.
    CreatePoll {
        caller: UserId,
        question: String,
        options: Vec<String>,
        timer_seconds: Option<u64>,
        allow_anonymous: bool,
        /// Response channel for the created poll or error.
        respond_to: oneshot::Sender<Result<Poll, PcError>>,
    },

    /// Launch a poll: activate it, start its countdown, broadcast
    /// `poll-launched`. Supersedes any currently active poll.
    LaunchPoll {
        caller: UserId,
        poll_id: PollId,
        /// Response channel for the launched poll or error.
        respond_to: oneshot::Sender<Result<Poll, PcError>>,
    },

    /// Close a poll before its countdown expires.
    ClosePoll {
        caller: UserId,
        poll_id: PollId,
        /// Response channel for the closed poll or error.
        respond_to: oneshot::Sender<Result<Poll, PcError>>,
    },

    /// A poll countdown expired. Sent by the timer task; ignored when
    /// `generation` no longer matches the current launch.
    TimerFired { poll_id: PollId, generation: u64 },

    /// Record a vote on the active poll and broadcast updated tallies.
    SubmitVote {
        poll_id: PollId,
        session_code: String,
        option_index: usize,
        voter_name: Option<String>,
        is_anonymous: bool,
        /// Response channel for the vote outcome or error.
        respond_to: oneshot::Sender<Result<VoteOutcome, PcError>>,
    },

    /// A participant joins the session room.
    JoinSession {
        connection_id: ConnectionId,
        name: Option<String>,
        is_anonymous: bool,
        /// Per-connection event channel registered with the room.
        event_sender: mpsc::Sender<RoomEvent>,
        /// Response channel for the join outcome or error.
        respond_to: oneshot::Sender<Result<JoinOutcome, PcError>>,
    },

    /// End the session. Closes any active poll, marks the session inactive.
    EndSession {
        caller: UserId,
        /// Response channel for the ended session or error.
        respond_to: oneshot::Sender<Result<Session, PcError>>,
    },

    /// Get the currently active poll, if any.
    CurrentActive {
        /// Response channel for the active poll snapshot.
        respond_to: oneshot::Sender<Option<Poll>>,
    },

    /// All polls of this session in creation order, with final tallies.
    GetHistory {
        /// Response channel for the poll history or error.
        respond_to: oneshot::Sender<Result<Vec<Poll>, PcError>>,
    },

    /// Get current session state (for debugging/health).
    GetState {
        /// Response channel for session state.
        respond_to: oneshot::Sender<SessionState>,
    },
}

// ----------------------------------------------------------------------------
// Supporting Types
// ----------------------------------------------------------------------------

/// Result of a recorded vote.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    /// Poll snapshot after the increment.
    pub poll: Poll,
    /// The persisted vote fact.
    pub vote: Vote,
}

/// Result of a successful session join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Session snapshot including the new participant record.
    pub session: Session,
    /// Room occupancy after the join.
    pub occupancy: usize,
}

/// Status of the `PollControllerActor`.
#[derive(Debug, Clone)]
pub struct ControllerStatus {
    /// Total live session actors.
    pub session_count: usize,
    /// Total connections registered across all rooms.
    pub connection_count: usize,
    /// Whether the controller is draining.
    pub is_draining: bool,
}

/// Current state of a session (for debugging/health).
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Session ID.
    pub session_id: SessionId,
    /// Session join code.
    pub session_code: String,
    /// Currently active poll, if any.
    pub active_poll_id: Option<PollId>,
    /// Launch generation of the current active poll.
    pub launch_generation: u64,
    /// Participant records on the session.
    pub participant_count: usize,
    /// Whether the session actor is shutting down.
    pub is_shutting_down: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_status_clone() {
        let status = ControllerStatus {
            session_count: 2,
            connection_count: 7,
            is_draining: false,
        };
        let cloned = status.clone();
        assert_eq!(cloned.session_count, 2);
        assert_eq!(cloned.connection_count, 7);
        assert!(!cloned.is_draining);
    }

    #[test]
    fn test_session_state_fields() {
        let state = SessionState {
            session_id: SessionId::new(),
            session_code: "ABCD12".to_string(),
            active_poll_id: None,
            launch_generation: 0,
            participant_count: 0,
            is_shutting_down: false,
        };
        assert!(state.active_poll_id.is_none());
        assert_eq!(state.launch_generation, 0);
    }

    #[test]
    fn test_vote_outcome_carries_poll_snapshot() {
        let poll = Poll::new(
            SessionId::new(),
            "Q".to_string(),
            vec!["A".to_string(), "B".to_string()],
            None,
            true,
        );
        let vote = Vote {
            id: common::types::VoteId::new(),
            poll_id: poll.id,
            session_id: poll.session_id,
            option_index: 1,
            voter_name: Some("Alice".to_string()),
            is_anonymous: false,
            voted_at: chrono::Utc::now(),
            response_time_ms: 1200,
        };
        let outcome = VoteOutcome { poll, vote };
        assert_eq!(outcome.vote.poll_id, outcome.poll.id);
    }
}
