//! Caller-identity collaborator interface.
//!
//! Authentication and credential issuance live outside the controller; the
//! only question the controller ever asks the auth layer is "is this caller
//! the owner of this session?".

use crate::store::{RecordStore, StoreError};
use crate::types::{SessionId, UserId};
use async_trait::async_trait;
use std::sync::Arc;

/// Ownership check supplied by the excluded auth layer.
#[async_trait]
pub trait CallerIdentity: Send + Sync {
    /// Whether `caller` owns the session. Unknown sessions are not owned
    /// by anyone.
    async fn is_owner(&self, session_id: SessionId, caller: UserId) -> Result<bool, StoreError>;
}

/// Default implementation that compares against the persisted owner field.
pub struct StoreBackedIdentity {
    store: Arc<dyn RecordStore>,
}

impl StoreBackedIdentity {
    /// Create an identity checker backed by the given record store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CallerIdentity for StoreBackedIdentity {
    async fn is_owner(&self, session_id: SessionId, caller: UserId) -> Result<bool, StoreError> {
        Ok(self
            .store
            .find_session_by_id(session_id)
            .await?
            .is_some_and(|s| s.owner_id == caller))
    }
}
