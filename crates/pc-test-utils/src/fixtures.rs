//! Pre-configured test data fixtures for PC testing.
//!
//! Provides builders for session owners and poll definitions so tests
//! read as scenarios rather than setup boilerplate.

use common::types::UserId;

/// Test session owner fixture.
#[derive(Debug, Clone)]
pub struct TestOwner {
    /// Owner user ID.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
}

impl TestOwner {
    /// Create an owner with a fresh random user ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            user_id: UserId::new(),
            name: "Test Owner".to_string(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for TestOwner {
    fn default() -> Self {
        Self::new()
    }
}

/// Test poll definition fixture.
///
/// Mirrors the arguments of `SessionHandle::create_poll` so a fixture can be
/// splatted straight into the call.
#[derive(Debug, Clone)]
pub struct TestPoll {
    /// Poll question text.
    pub question: String,
    /// Option labels, in display order.
    pub options: Vec<String>,
    /// Countdown override in seconds, or `None` for the session default.
    pub timer_seconds: Option<u64>,
    /// Whether anonymous votes are accepted.
    pub allow_anonymous: bool,
}

impl TestPoll {
    /// A two-option poll with the given question.
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            options: vec!["Yes".to_string(), "No".to_string()],
            timer_seconds: None,
            allow_anonymous: true,
        }
    }

    /// Replace the option labels.
    #[must_use]
    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Set a countdown override.
    #[must_use]
    pub fn with_timer(mut self, seconds: u64) -> Self {
        self.timer_seconds = Some(seconds);
        self
    }

    /// Reject anonymous ballots.
    #[must_use]
    pub fn named_voters_only(mut self) -> Self {
        self.allow_anonymous = false;
        self
    }
}
