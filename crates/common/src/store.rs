//! Record store collaborator interface.
//!
//! The poll controller never embeds storage-query logic; everything it needs
//! from persistence goes through this narrow trait. The production deployment
//! plugs in a real database-backed implementation; the binary and the test
//! suite use [`crate::memory::MemoryStore`].

use crate::entities::{Poll, Session, Vote};
use crate::types::{PollId, SessionId, UserId};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a record store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No session with the given ID or code.
    #[error("session not found")]
    SessionNotFound,

    /// No poll with the given ID.
    #[error("poll not found")]
    PollNotFound,

    /// Uniqueness violation (e.g. duplicate session code).
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend failure (connection, serialization, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Narrow persistence interface consumed by the poll controller.
///
/// Implementations must be safe for concurrent use; the controller calls
/// these methods from many actor tasks without external synchronization.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find a session by its short join code.
    async fn find_session_by_code(&self, code: &str) -> Result<Option<Session>, StoreError>;

    /// Find a session by ID.
    async fn find_session_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// All sessions owned by a user, in creation order. Backs the owner's
    /// session history view.
    async fn find_sessions_by_owner(&self, owner_id: UserId) -> Result<Vec<Session>, StoreError>;

    /// Persist a new session. Fails with [`StoreError::DuplicateKey`] if the
    /// session code is already taken.
    async fn create_session(&self, session: Session) -> Result<(), StoreError>;

    /// Replace a persisted session record.
    async fn update_session(&self, session: Session) -> Result<(), StoreError>;

    /// Find a poll by ID.
    async fn find_poll_by_id(&self, id: PollId) -> Result<Option<Poll>, StoreError>;

    /// All polls belonging to a session, in creation order.
    async fn find_polls_by_session(&self, id: SessionId) -> Result<Vec<Poll>, StoreError>;

    /// Persist a new poll.
    async fn create_poll(&self, poll: Poll) -> Result<(), StoreError>;

    /// Replace a persisted poll record.
    async fn update_poll(&self, poll: Poll) -> Result<(), StoreError>;

    /// Append a vote fact. Votes are never updated or deleted.
    async fn create_vote(&self, vote: Vote) -> Result<(), StoreError>;

    /// All votes cast on a poll, in submission order.
    async fn find_votes_by_poll(&self, id: PollId) -> Result<Vec<Vote>, StoreError>;
}
