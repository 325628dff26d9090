//! Poll Controller error types.
//!
//! Error types map to stable `ErrorCode` values for client responses.
//! Internal details are logged server-side but not exposed to clients.

use common::store::StoreError;
use thiserror::Error;

/// Poll Controller error type.
///
/// Maps to error codes:
/// - `NotAuthorized`: `FORBIDDEN` (3)
/// - `SessionNotFound`, `PollNotFound`: `NOT_FOUND` (4)
/// - `Conflict`: `CONFLICT` (5)
/// - `Store`, `Config`, `Internal`: `INTERNAL_ERROR` (6)
/// - `Draining`, `CodeSpaceExhausted`, `CapacityExceeded`: `CAPACITY_EXCEEDED` (7)
/// - `PollNotActive`, `SessionMismatch`, `InvalidOptionIndex`,
///   `InvalidPoll`, `SessionClosed`: `INVALID_REQUEST` (8)
#[derive(Debug, Error)]
pub enum PcError {
    /// Session not found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Poll not found.
    #[error("Poll not found: {0}")]
    PollNotFound(String),

    /// Caller is not the session owner.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Vote arrived while the poll was Draft or Closed.
    #[error("Poll is not active: {0}")]
    PollNotActive(String),

    /// Poll does not belong to the stated session.
    #[error("Poll does not belong to session {session_code}")]
    SessionMismatch { session_code: String },

    /// Vote named an option index outside the poll's option list.
    #[error("Option index {index} out of range (poll has {option_count} options)")]
    InvalidOptionIndex { index: usize, option_count: usize },

    /// Malformed poll definition (empty question, too few options).
    #[error("Invalid poll: {0}")]
    InvalidPoll(String),

    /// Code allocator gave up after its retry bound.
    #[error("Session code space exhausted after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    /// Session limit reached.
    #[error("Session capacity reached (limit {limit})")]
    CapacityExceeded { limit: usize },

    /// Session has ended; no further joins or polls.
    #[error("Session has ended: {0}")]
    SessionClosed(String),

    /// Conflict (e.g. session actor already exists).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Controller is draining (graceful shutdown).
    #[error("Controller is draining")]
    Draining,

    /// Record store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PcError {
    /// Returns the stable `ErrorCode` value for this error.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        match self {
            PcError::Store(_) | PcError::Config(_) | PcError::Internal(_) => 6, // INTERNAL_ERROR
            PcError::NotAuthorized(_) => 3,                                     // FORBIDDEN
            PcError::SessionNotFound(_) | PcError::PollNotFound(_) => 4,        // NOT_FOUND
            PcError::Conflict(_) => 5,                                          // CONFLICT
            PcError::Draining
            | PcError::CodeSpaceExhausted { .. }
            | PcError::CapacityExceeded { .. } => 7, // CAPACITY_EXCEEDED
            PcError::PollNotActive(_)
            | PcError::SessionMismatch { .. }
            | PcError::InvalidOptionIndex { .. }
            | PcError::InvalidPoll(_)
            | PcError::SessionClosed(_) => 8, // INVALID_REQUEST
        }
    }

    /// Returns a client-safe error message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            PcError::Store(_) | PcError::Config(_) | PcError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            PcError::SessionNotFound(_) => "Session not found".to_string(),
            PcError::PollNotFound(_) => "Poll not found".to_string(),
            PcError::NotAuthorized(_) => "Not authorized".to_string(),
            PcError::PollNotActive(_) => "Poll is not accepting votes".to_string(),
            PcError::SessionMismatch { .. } => {
                "Poll does not belong to this session".to_string()
            }
            PcError::InvalidOptionIndex { .. } => "Invalid option".to_string(),
            PcError::InvalidPoll(msg) => msg.clone(),
            PcError::CodeSpaceExhausted { .. } => {
                "Could not allocate a session code, please try again".to_string()
            }
            PcError::CapacityExceeded { .. } => {
                "Server is at capacity, please try again later".to_string()
            }
            PcError::SessionClosed(_) => "Session has ended".to_string(),
            PcError::Conflict(msg) => msg.clone(),
            PcError::Draining => "Server is shutting down, please reconnect".to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        // Internal errors -> 6
        assert_eq!(
            PcError::Store(StoreError::Backend("down".to_string())).error_code(),
            6
        );
        assert_eq!(PcError::Internal("oops".to_string()).error_code(), 6);
        assert_eq!(PcError::Config("bad".to_string()).error_code(), 6);

        // Forbidden -> 3
        assert_eq!(
            PcError::NotAuthorized("not the owner".to_string()).error_code(),
            3
        );

        // Not found -> 4
        assert_eq!(
            PcError::SessionNotFound("ABCD12".to_string()).error_code(),
            4
        );
        assert_eq!(PcError::PollNotFound("p-1".to_string()).error_code(), 4);

        // Conflict -> 5
        assert_eq!(
            PcError::Conflict("already exists".to_string()).error_code(),
            5
        );

        // Capacity -> 7
        assert_eq!(PcError::Draining.error_code(), 7);
        assert_eq!(
            PcError::CodeSpaceExhausted { attempts: 32 }.error_code(),
            7
        );

        // Invalid request -> 8
        assert_eq!(
            PcError::PollNotActive("p-1".to_string()).error_code(),
            8
        );
        assert_eq!(
            PcError::SessionMismatch {
                session_code: "ABCD12".to_string()
            }
            .error_code(),
            8
        );
        assert_eq!(
            PcError::InvalidOptionIndex {
                index: 7,
                option_count: 2
            }
            .error_code(),
            8
        );
        assert_eq!(PcError::SessionClosed("s-1".to_string()).error_code(), 8);
        assert_eq!(
            PcError::InvalidPoll("at least two options required".to_string()).error_code(),
            8
        );
    }

    #[test]
    fn test_client_messages_hide_internal_details() {
        let store_err = PcError::Store(StoreError::Backend(
            "connection refused at 192.168.1.100:5432".to_string(),
        ));
        assert!(!store_err.client_message().contains("192.168"));
        assert_eq!(store_err.client_message(), "An internal error occurred");

        let internal = PcError::Internal("mailbox closed for session abc".to_string());
        assert!(!internal.client_message().contains("mailbox"));
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!(
                "{}",
                PcError::InvalidOptionIndex {
                    index: 3,
                    option_count: 2
                }
            ),
            "Option index 3 out of range (poll has 2 options)"
        );
        assert_eq!(
            format!("{}", PcError::CodeSpaceExhausted { attempts: 16 }),
            "Session code space exhausted after 16 attempts"
        );
    }

    #[test]
    fn test_store_error_conversion() {
        let err: PcError = StoreError::SessionNotFound.into();
        assert!(matches!(err, PcError::Store(_)));
        assert_eq!(err.error_code(), 6);
    }
}
