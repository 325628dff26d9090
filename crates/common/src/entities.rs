//! Persisted domain entities: sessions, polls and votes.
//!
//! These mirror what the external record store persists. The controller is
//! the only writer of `Poll` lifecycle fields and option counters; votes are
//! append-only facts and are never mutated after creation.

use crate::types::{PollId, SessionId, UserId, VoteId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default poll countdown when the creator does not specify one.
pub const DEFAULT_POLL_TIMER_SECONDS: u64 = 30;

/// A participant record inside a session.
///
/// Anonymous participants are stored with the anonymous marker set and a
/// generic display name, matching what the room shows for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Display name, or "Anonymous" for anonymous joins.
    pub name: String,
    /// Whether this participant joined anonymously.
    pub is_anonymous: bool,
    /// When the participant joined the session.
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    /// Create a participant record, normalizing anonymous joins.
    #[must_use]
    pub fn new(name: Option<String>, is_anonymous: bool, joined_at: DateTime<Utc>) -> Self {
        let name = if is_anonymous {
            "Anonymous".to_string()
        } else {
            name.unwrap_or_default().trim().to_string()
        };
        Self {
            name,
            is_anonymous,
            joined_at,
        }
    }
}

/// A polling session: one owner, a short join code, zero or more polls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID.
    pub id: SessionId,
    /// Owning identity (from the excluded auth layer).
    pub owner_id: UserId,
    /// Short human-enterable join code. Immutable after creation.
    pub session_code: String,
    /// Session title.
    pub title: String,
    /// Whether the session is still running. Once false the session is
    /// terminal: no further joins or polls.
    pub is_active: bool,
    /// Ordered participant records, in join order.
    pub participants: Vec<Participant>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Set when the owner ends the session.
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a new active session with no participants.
    #[must_use]
    pub fn new(owner_id: UserId, session_code: String, title: String) -> Self {
        Self {
            id: SessionId::new(),
            owner_id,
            session_code,
            title,
            is_active: true,
            participants: Vec::new(),
            created_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// One answer option on a poll, with its running tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    /// Option text.
    pub text: String,
    /// Vote count. Non-negative, monotone while the poll is active,
    /// frozen once closed.
    pub votes: u64,
}

/// Poll lifecycle state, derived from the persisted flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollState {
    /// Created, never launched.
    Draft,
    /// Launched, countdown running.
    Active,
    /// Terminal: closed by timer expiry, explicit end, or supersession.
    Closed,
}

/// A single question with fixed options, launched at most once-active-at-a-time
/// within its session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    /// Poll ID.
    pub id: PollId,
    /// Owning session.
    pub session_id: SessionId,
    /// Question text.
    pub question: String,
    /// Ordered options with tallies.
    pub options: Vec<PollOption>,
    /// Whether the poll has ever been launched.
    pub is_launched: bool,
    /// Whether the poll is currently accepting votes.
    pub is_active: bool,
    /// Countdown duration in seconds.
    pub timer_seconds: u64,
    /// Whether anonymous votes are accepted.
    pub allow_anonymous: bool,
    /// Set at launch; response latencies are measured from this instant.
    pub timer_started_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Set when the poll closes.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Poll {
    /// Create a draft poll with zeroed tallies.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        question: String,
        options: Vec<String>,
        timer_seconds: Option<u64>,
        allow_anonymous: bool,
    ) -> Self {
        Self {
            id: PollId::new(),
            session_id,
            question,
            options: options
                .into_iter()
                .map(|text| PollOption { text, votes: 0 })
                .collect(),
            is_launched: false,
            is_active: false,
            timer_seconds: timer_seconds.unwrap_or(DEFAULT_POLL_TIMER_SECONDS),
            allow_anonymous,
            timer_started_at: None,
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    /// Current lifecycle state, derived from the persisted flags.
    #[must_use]
    pub fn state(&self) -> PollState {
        if self.is_active {
            PollState::Active
        } else if self.is_launched {
            PollState::Closed
        } else {
            PollState::Draft
        }
    }

    /// Total votes across all options.
    #[must_use]
    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|o| o.votes).sum()
    }
}

/// An immutable record of one submission on one poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    /// Vote ID.
    pub id: VoteId,
    /// Poll this vote was cast on.
    pub poll_id: PollId,
    /// Session the poll belongs to (denormalized for history queries).
    pub session_id: SessionId,
    /// Index of the selected option.
    pub option_index: usize,
    /// Voter display name, if not anonymous.
    pub voter_name: Option<String>,
    /// Whether the vote was cast anonymously.
    pub is_anonymous: bool,
    /// Submission timestamp.
    pub voted_at: DateTime<Utc>,
    /// Milliseconds from poll launch to submission.
    pub response_time_ms: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_poll_is_draft_with_zeroed_counters() {
        let poll = Poll::new(
            SessionId::new(),
            "Favorite color?".to_string(),
            vec!["Red".to_string(), "Blue".to_string()],
            Some(5),
            true,
        );

        assert_eq!(poll.state(), PollState::Draft);
        assert!(!poll.is_launched);
        assert!(!poll.is_active);
        assert_eq!(poll.timer_seconds, 5);
        assert!(poll.options.iter().all(|o| o.votes == 0));
        assert_eq!(poll.total_votes(), 0);
    }

    #[test]
    fn test_poll_timer_defaults() {
        let poll = Poll::new(
            SessionId::new(),
            "Q".to_string(),
            vec!["A".to_string()],
            None,
            true,
        );
        assert_eq!(poll.timer_seconds, DEFAULT_POLL_TIMER_SECONDS);
    }

    #[test]
    fn test_poll_state_derivation() {
        let mut poll = Poll::new(
            SessionId::new(),
            "Q".to_string(),
            vec!["A".to_string()],
            None,
            true,
        );

        poll.is_launched = true;
        poll.is_active = true;
        assert_eq!(poll.state(), PollState::Active);

        poll.is_active = false;
        assert_eq!(poll.state(), PollState::Closed);
    }

    #[test]
    fn test_anonymous_participant_normalization() {
        let p = Participant::new(Some("Alice".to_string()), true, Utc::now());
        assert_eq!(p.name, "Anonymous");
        assert!(p.is_anonymous);

        let p = Participant::new(Some("  Bob  ".to_string()), false, Utc::now());
        assert_eq!(p.name, "Bob");
    }
}
