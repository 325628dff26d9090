//! In-memory [`RecordStore`] implementation.
//!
//! Backs the binary's default deployment and the whole test suite. State is
//! held in `tokio::sync::RwLock`-guarded maps; locks are only ever held for
//! the duration of a map operation, never across external awaits.

use crate::entities::{Poll, Session, Vote};
use crate::store::{RecordStore, StoreError};
use crate::types::{PollId, SessionId, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local record store.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    polls: RwLock<HashMap<PollId, Poll>>,
    votes: RwLock<Vec<Vote>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_session_by_code(&self, code: &str) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.values().find(|s| s.session_code == code).cloned())
    }

    async fn find_session_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id).cloned())
    }

    async fn find_sessions_by_owner(&self, owner_id: UserId) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut found: Vec<Session> = sessions
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.created_at);
        Ok(found)
    }

    async fn create_session(&self, session: Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions
            .values()
            .any(|s| s.session_code == session.session_code)
        {
            return Err(StoreError::DuplicateKey(session.session_code));
        }
        sessions.insert(session.id, session);
        Ok(())
    }

    async fn update_session(&self, session: Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&session.id) {
            return Err(StoreError::SessionNotFound);
        }
        sessions.insert(session.id, session);
        Ok(())
    }

    async fn find_poll_by_id(&self, id: PollId) -> Result<Option<Poll>, StoreError> {
        let polls = self.polls.read().await;
        Ok(polls.get(&id).cloned())
    }

    async fn find_polls_by_session(&self, id: SessionId) -> Result<Vec<Poll>, StoreError> {
        let polls = self.polls.read().await;
        let mut found: Vec<Poll> = polls
            .values()
            .filter(|p| p.session_id == id)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.created_at);
        Ok(found)
    }

    async fn create_poll(&self, poll: Poll) -> Result<(), StoreError> {
        let mut polls = self.polls.write().await;
        polls.insert(poll.id, poll);
        Ok(())
    }

    async fn update_poll(&self, poll: Poll) -> Result<(), StoreError> {
        let mut polls = self.polls.write().await;
        if !polls.contains_key(&poll.id) {
            return Err(StoreError::PollNotFound);
        }
        polls.insert(poll.id, poll);
        Ok(())
    }

    async fn create_vote(&self, vote: Vote) -> Result<(), StoreError> {
        let mut votes = self.votes.write().await;
        votes.push(vote);
        Ok(())
    }

    async fn find_votes_by_poll(&self, id: PollId) -> Result<Vec<Vote>, StoreError> {
        let votes = self.votes.read().await;
        Ok(votes.iter().filter(|v| v.poll_id == id).cloned().collect())
    }
}
