//! Common types shared across the Pollwave poll controller.
//!
//! Everything the controller shares with its collaborators lives here:
//! the persisted domain entities (sessions, polls, votes), the narrow
//! [`store::RecordStore`] interface the controller uses instead of embedding
//! storage logic, the [`identity::CallerIdentity`] seam the excluded auth
//! layer plugs into, and an in-memory store used by the binary and tests.

#![warn(clippy::pedantic)]

/// Module for persisted domain entities
pub mod entities;

/// Module for caller-identity collaborator trait
pub mod identity;

/// Module for the in-memory record store
pub mod memory;

/// Module for the record store collaborator trait
pub mod store;

/// Module for shared identifier types
pub mod types;
