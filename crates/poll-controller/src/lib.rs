//! Poll Controller Service Library
//!
//! This library provides the core functionality of the live poll
//! orchestration service - a stateful server responsible for:
//!
//! - Session lifecycle: short join codes, participant rosters, room
//!   occupancy
//! - Poll lifecycle: draft, launch with a countdown, close exactly once
//! - Vote aggregation with serialized tally increments
//! - Best-effort room event fan-out to connected clients
//! - Graceful shutdown with session draining
//!
//! # Architecture
//!
//! The controller uses an actor model hierarchy:
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
//! - **Per-session serialization**: a session's mailbox is the only path to
//!   its tallies, so concurrent votes are lost-update-free by construction
//! - **Generation-keyed countdowns**: every launch invalidates older timers;
//!   supersession and explicit close cancel the running one
//! - **Owned registry**: room membership lives in an injected
//!   [`registry::SessionRegistry`], not in process globals
//!
//! # Modules
//!
//! - [`actors`] - Actor model implementation
//! - [`bus`] - Room-scoped event fan-out
//! - [`codes`] - Session code allocation
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with stable error codes
//! - [`events`] - Room event wire payloads
//! - [`observability`] - Health endpoints
//! - [`registry`] - Room membership registry

pub mod actors;
pub mod bus;
pub mod codes;
pub mod config;
pub mod errors;
pub mod events;
pub mod observability;
pub mod registry;
