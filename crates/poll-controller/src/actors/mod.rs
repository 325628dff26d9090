//! Actor model implementation for the Poll Controller.
//!
//! ```text
//! PollControllerActor (singleton per controller instance)
//! └── supervises N SessionActors
//!     └── SessionActor (one per live session)
//!         ├── owns the poll lifecycle and vote tallies
//!         └── spawns one timer task per poll launch
//! ```
//!
//! # Key Design Decisions
//!
//! - **One actor per session**: all poll state transitions and vote
//!   increments for a session run on that actor's task, serialized by its
//!   mailbox
//! - **Generation-keyed countdowns**: each launch gets a fresh timer task and
//!   a monotonically increasing generation; stale expiries are dropped
//! - **CancellationToken propagation**: parent actors pass child tokens for
//!   graceful shutdown
//! - **Message passing**: all inter-actor communication via
//!   `tokio::sync::mpsc` channels
//!
//! # Modules
//!
//! - [`controller`] - `PollControllerActor` singleton that supervises sessions
//! - [`session`] - `SessionActor` per live session, owns poll state
//! - [`messages`] - Message types for actor communication
//! - [`metrics`] - Shared controller counters

pub mod controller;
pub mod messages;
pub mod metrics;
pub mod session;

// Re-export primary types
pub use controller::{PollControllerActor, PollControllerHandle};
pub use messages::{ControllerStatus, JoinOutcome, SessionState, VoteOutcome};
pub use metrics::ControllerMetrics;
pub use session::{SessionActor, SessionHandle};
