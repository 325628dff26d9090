//! # PC Test Utilities
//!
//! Shared test utilities for the Poll Controller (PC) service.
//!
//! This crate provides a wired-up controller harness and test fixtures for
//! isolated PC testing without requiring real infrastructure.
//!
//! ## Modules
//!
//! - `harness` - A fully wired controller (in-memory store, registry, bus)
//! - `fixtures` - Pre-configured test data (owners, poll definitions)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pc_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let harness = TestHarness::new();
//!     let owner = TestOwner::new();
//!
//!     let session = harness
//!         .controller
//!         .open_session(owner.user_id, "Friday retro".to_string())
//!         .await
//!         .unwrap();
//!
//!     let room = harness
//!         .controller
//!         .resolve_session(session.session_code.clone())
//!         .await
//!         .unwrap();
//!
//!     // Run your test...
//! }
//! ```

pub mod fixtures;
pub mod harness;

pub use fixtures::{TestOwner, TestPoll};
pub use harness::{EventCollector, TestHarness};
