//! `PollControllerActor` - singleton supervisor for session actors.
//!
//! The `PollControllerActor` is the top-level actor in the hierarchy:
//!
//! - Singleton per controller instance
//! - Supervises N `SessionActor` instances
//! - Opens sessions: allocates the join code, persists the record, spawns
//!   the actor
//! - Routes poll-keyed operations to the owning session actor
//! - Owns the root `CancellationToken` for graceful shutdown
//! - Monitors child actor health (panic detection via `JoinHandle`)
//!
//! Session actors for sessions that are still active in the record store but
//! have no running actor (after a controller restart) are respawned lazily on
//! first lookup.

use crate::bus::RoomBus;
use crate::codes::CodeAllocator;
use crate::config::Config;
use crate::errors::PcError;

use super::messages::{ControllerMessage, ControllerStatus};
use super::metrics::ControllerMetrics;
use super::session::{SessionActor, SessionHandle};

use common::entities::Session;
use common::identity::CallerIdentity;
use common::store::RecordStore;
use common::types::{PollId, SessionId, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Default channel buffer size for the controller mailbox.
const CONTROLLER_CHANNEL_BUFFER: usize = 1000;

/// Handle to the `PollControllerActor`.
///
/// This is the public interface for interacting with the controller.
/// All methods are async and return results via oneshot channels.
#[derive(Clone)]
pub struct PollControllerHandle {
    sender: mpsc::Sender<ControllerMessage>,
    cancel_token: CancellationToken,
}

impl PollControllerHandle {
    /// Create a new `PollControllerActor` and return a handle to it.
    ///
    /// This spawns the actor task and returns immediately.
    #[must_use]
    pub fn new(
        config: &Config,
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn CallerIdentity>,
        bus: RoomBus,
        metrics: Arc<ControllerMetrics>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(CONTROLLER_CHANNEL_BUFFER);
        let cancel_token = CancellationToken::new();

        let actor = PollControllerActor::new(
            config,
            receiver,
            cancel_token.clone(),
            store,
            identity,
            bus,
            metrics,
        );

        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
        }
    }

    /// Open a new session owned by `owner_id`.
    pub async fn open_session(&self, owner_id: UserId, title: String) -> Result<Session, PcError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::OpenSession {
                owner_id,
                title,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Resolve a session actor handle by join code.
    pub async fn resolve_session(&self, session_code: String) -> Result<SessionHandle, PcError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::ResolveSession {
                session_code,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Resolve the session actor that owns a poll.
    pub async fn resolve_poll(&self, poll_id: PollId) -> Result<SessionHandle, PcError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::ResolvePoll {
                poll_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// List every session a user has owned, newest last.
    pub async fn owner_history(&self, owner_id: UserId) -> Result<Vec<Session>, PcError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::OwnerHistory {
                owner_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Remove a session actor (after the session ends).
    pub async fn remove_session(&self, session_id: SessionId) -> Result<(), PcError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::RemoveSession {
                session_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Get the current controller status.
    pub async fn get_status(&self) -> Result<ControllerStatus, PcError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::GetStatus { respond_to: tx })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))
    }

    /// Initiate graceful shutdown.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), PcError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::Shutdown {
                deadline,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Cancel the actor (for immediate shutdown).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Get a child token for auxiliary tasks tied to the actor lifetime.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

/// Internal state for a managed session.
struct ManagedSession {
    /// Handle to the session actor.
    handle: SessionHandle,
    /// Join handle for monitoring the actor task.
    task_handle: JoinHandle<()>,
}

/// The `PollControllerActor` implementation.
///
/// This struct owns the actor state and runs the message loop.
pub struct PollControllerActor {
    /// Controller instance ID.
    pc_id: String,
    /// Message receiver.
    receiver: mpsc::Receiver<ControllerMessage>,
    /// Cancellation token (root).
    cancel_token: CancellationToken,
    /// Managed sessions by ID.
    sessions: HashMap<SessionId, ManagedSession>,
    /// Session ID lookup by join code.
    by_code: HashMap<String, SessionId>,
    /// Record store.
    store: Arc<dyn RecordStore>,
    /// Ownership checks, passed down to session actors.
    identity: Arc<dyn CallerIdentity>,
    /// Room event publisher, passed down to session actors.
    bus: RoomBus,
    /// Join code allocator.
    allocator: CodeAllocator,
    /// Countdown applied when a poll is created without one.
    default_timer_seconds: u64,
    /// Upper bound on live session actors.
    max_sessions: usize,
    /// Whether the controller is accepting new sessions.
    accepting_new: bool,
    /// Shared metrics.
    metrics: Arc<ControllerMetrics>,
}

impl PollControllerActor {
    /// Create a new controller actor (not started).
    fn new(
        config: &Config,
        receiver: mpsc::Receiver<ControllerMessage>,
        cancel_token: CancellationToken,
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn CallerIdentity>,
        bus: RoomBus,
        metrics: Arc<ControllerMetrics>,
    ) -> Self {
        let allocator = CodeAllocator::new(
            Arc::clone(&store),
            config.code_length,
            config.code_max_attempts,
        );

        Self {
            pc_id: config.pc_id.clone(),
            receiver,
            cancel_token,
            sessions: HashMap::new(),
            by_code: HashMap::new(),
            store,
            identity,
            bus,
            allocator,
            default_timer_seconds: config.default_poll_timer_seconds,
            max_sessions: config.max_sessions as usize,
            accepting_new: true,
            metrics,
        }
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "pc.actor.controller", fields(pc_id = %self.pc_id))]
    async fn run(mut self) {
        info!(
            target: "pc.actor.controller",
            pc_id = %self.pc_id,
            "PollControllerActor started"
        );

        loop {
            // Check for terminated session actors
            self.check_session_health().await;

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "pc.actor.controller",
                        pc_id = %self.pc_id,
                        "PollControllerActor received cancellation signal"
                    );
                    self.graceful_shutdown().await;
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.handle_message(message).await;
                        }
                        None => {
                            info!(
                                target: "pc.actor.controller",
                                pc_id = %self.pc_id,
                                "PollControllerActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "pc.actor.controller",
            pc_id = %self.pc_id,
            sessions_remaining = self.sessions.len(),
            "PollControllerActor stopped"
        );
    }

    /// Handle a single message.
    async fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::OpenSession {
                owner_id,
                title,
                respond_to,
            } => {
                let result = self.open_session(owner_id, title).await;
                let _ = respond_to.send(result);
            }

            ControllerMessage::ResolveSession {
                session_code,
                respond_to,
            } => {
                let result = self.resolve_session(&session_code).await;
                let _ = respond_to.send(result);
            }

            ControllerMessage::ResolvePoll {
                poll_id,
                respond_to,
            } => {
                let result = self.resolve_poll(poll_id).await;
                let _ = respond_to.send(result);
            }

            ControllerMessage::OwnerHistory {
                owner_id,
                respond_to,
            } => {
                let result = self
                    .store
                    .find_sessions_by_owner(owner_id)
                    .await
                    .map_err(PcError::from);
                let _ = respond_to.send(result);
            }

            ControllerMessage::RemoveSession {
                session_id,
                respond_to,
            } => {
                let result = self.remove_session(session_id);
                let _ = respond_to.send(result);
            }

            ControllerMessage::GetStatus { respond_to } => {
                let status = self.get_status();
                let _ = respond_to.send(status);
            }

            ControllerMessage::Shutdown {
                deadline,
                respond_to,
            } => {
                let result = self.initiate_shutdown(deadline);
                let _ = respond_to.send(result);
            }
        }
    }

    /// Spawn a session actor for a persisted session record.
    fn spawn_session_actor(&mut self, session: &Session) -> SessionHandle {
        let session_token = self.cancel_token.child_token();
        let (handle, task_handle) = SessionActor::spawn(
            session.id,
            session.session_code.clone(),
            session_token,
            Arc::clone(&self.store),
            Arc::clone(&self.identity),
            self.bus.clone(),
            self.default_timer_seconds,
            Arc::clone(&self.metrics),
        );

        self.sessions.insert(
            session.id,
            ManagedSession {
                handle: handle.clone(),
                task_handle,
            },
        );
        self.by_code
            .insert(session.session_code.clone(), session.id);
        self.metrics.increment_sessions();

        handle
    }

    /// Open a new session: allocate a code, persist, spawn the actor.
    #[instrument(skip_all, fields(pc_id = %self.pc_id))]
    async fn open_session(
        &mut self,
        owner_id: UserId,
        title: String,
    ) -> Result<Session, PcError> {
        if !self.accepting_new {
            return Err(PcError::Draining);
        }
        if self.sessions.len() >= self.max_sessions {
            return Err(PcError::CapacityExceeded {
                limit: self.max_sessions,
            });
        }

        let code = self.allocator.allocate().await?;
        let session = Session::new(owner_id, code, title);
        self.store.create_session(session.clone()).await?;

        self.spawn_session_actor(&session);

        info!(
            target: "pc.actor.controller",
            pc_id = %self.pc_id,
            session_code = %session.session_code,
            total_sessions = self.sessions.len(),
            "Session opened"
        );

        Ok(session)
    }

    /// Resolve a session actor by join code, respawning from the record
    /// store if the actor is not running.
    async fn resolve_session(&mut self, session_code: &str) -> Result<SessionHandle, PcError> {
        if let Some(session_id) = self.by_code.get(session_code).copied() {
            if let Some(managed) = self.sessions.get(&session_id) {
                if !managed.task_handle.is_finished() {
                    return Ok(managed.handle.clone());
                }
                // The actor already exited; reap it and consult the store.
                self.check_session_health().await;
            }
        }

        let session = self
            .store
            .find_session_by_code(session_code)
            .await?
            .ok_or_else(|| PcError::SessionNotFound(session_code.to_string()))?;
        self.revive_session(session)
    }

    /// Resolve the session actor owning a poll.
    async fn resolve_poll(&mut self, poll_id: PollId) -> Result<SessionHandle, PcError> {
        let poll = self
            .store
            .find_poll_by_id(poll_id)
            .await?
            .ok_or_else(|| PcError::PollNotFound(poll_id.to_string()))?;

        if let Some(managed) = self.sessions.get(&poll.session_id) {
            if !managed.task_handle.is_finished() {
                return Ok(managed.handle.clone());
            }
            self.check_session_health().await;
        }

        let session = self
            .store
            .find_session_by_id(poll.session_id)
            .await?
            .ok_or_else(|| PcError::PollNotFound(poll_id.to_string()))?;
        self.revive_session(session)
    }

    /// Respawn an actor for a stored session that has none running.
    fn revive_session(&mut self, session: Session) -> Result<SessionHandle, PcError> {
        if !session.is_active {
            return Err(PcError::SessionClosed(session.session_code));
        }
        if !self.accepting_new {
            return Err(PcError::Draining);
        }

        debug!(
            target: "pc.actor.controller",
            pc_id = %self.pc_id,
            session_code = %session.session_code,
            "Respawning actor for stored session"
        );

        Ok(self.spawn_session_actor(&session))
    }

    /// Remove a session actor.
    ///
    /// Initiates removal without blocking on the actor task; cleanup is
    /// awaited on a background task so the message loop keeps draining.
    fn remove_session(&mut self, session_id: SessionId) -> Result<(), PcError> {
        match self.sessions.remove(&session_id) {
            Some(managed) => {
                self.by_code.remove(managed.handle.session_code());
                managed.handle.cancel();

                let pc_id = self.pc_id.clone();
                tokio::spawn(async move {
                    match tokio::time::timeout(Duration::from_secs(5), managed.task_handle).await {
                        Ok(Ok(())) => {
                            debug!(
                                target: "pc.actor.controller",
                                pc_id = %pc_id,
                                session_id = %session_id,
                                "Session actor task completed cleanly"
                            );
                        }
                        Ok(Err(e)) => {
                            warn!(
                                target: "pc.actor.controller",
                                pc_id = %pc_id,
                                session_id = %session_id,
                                error = ?e,
                                "Session actor task panicked during removal"
                            );
                        }
                        Err(_) => {
                            warn!(
                                target: "pc.actor.controller",
                                pc_id = %pc_id,
                                session_id = %session_id,
                                "Session actor task cleanup timed out"
                            );
                        }
                    }
                });

                self.metrics.decrement_sessions();

                info!(
                    target: "pc.actor.controller",
                    pc_id = %self.pc_id,
                    session_id = %session_id,
                    total_sessions = self.sessions.len(),
                    "Session actor removed"
                );

                Ok(())
            }
            None => Err(PcError::SessionNotFound(session_id.to_string())),
        }
    }

    /// Get current controller status.
    fn get_status(&self) -> ControllerStatus {
        ControllerStatus {
            session_count: self.sessions.len(),
            connection_count: self.bus.registry().connection_count(),
            is_draining: !self.accepting_new,
        }
    }

    /// Initiate graceful shutdown.
    fn initiate_shutdown(&mut self, _deadline: Duration) -> Result<(), PcError> {
        info!(
            target: "pc.actor.controller",
            pc_id = %self.pc_id,
            session_count = self.sessions.len(),
            "Initiating graceful shutdown"
        );

        self.accepting_new = false;
        self.cancel_token.cancel();

        Ok(())
    }

    /// Perform graceful shutdown.
    async fn graceful_shutdown(&mut self) {
        info!(
            target: "pc.actor.controller",
            pc_id = %self.pc_id,
            session_count = self.sessions.len(),
            "Performing graceful shutdown"
        );

        self.accepting_new = false;

        // Already cancelled via the parent token, but be explicit.
        for managed in self.sessions.values() {
            managed.handle.cancel();
        }

        for (session_id, managed) in self.sessions.drain() {
            match tokio::time::timeout(Duration::from_secs(30), managed.task_handle).await {
                Ok(Ok(())) => {
                    debug!(
                        target: "pc.actor.controller",
                        pc_id = %self.pc_id,
                        session_id = %session_id,
                        "Session actor completed cleanly"
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        target: "pc.actor.controller",
                        pc_id = %self.pc_id,
                        session_id = %session_id,
                        error = ?e,
                        "Session actor task panicked during shutdown"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "pc.actor.controller",
                        pc_id = %self.pc_id,
                        session_id = %session_id,
                        "Session actor shutdown timed out"
                    );
                }
            }
        }

        info!(
            target: "pc.actor.controller",
            pc_id = %self.pc_id,
            "Graceful shutdown complete"
        );
    }

    /// Check health of managed session actors.
    ///
    /// A session actor exits cleanly when its session ends; that is the
    /// normal path. A panic is logged and the entry reaped.
    async fn check_session_health(&mut self) {
        let mut finished = Vec::new();

        for (session_id, managed) in &self.sessions {
            if managed.task_handle.is_finished() {
                finished.push(*session_id);
            }
        }

        for session_id in finished {
            if let Some(managed) = self.sessions.remove(&session_id) {
                self.by_code.remove(managed.handle.session_code());

                match managed.task_handle.await {
                    Ok(()) => {
                        info!(
                            target: "pc.actor.controller",
                            pc_id = %self.pc_id,
                            session_id = %session_id,
                            "Session actor exited cleanly"
                        );
                    }
                    Err(join_error) => {
                        if join_error.is_panic() {
                            error!(
                                target: "pc.actor.controller",
                                pc_id = %self.pc_id,
                                session_id = %session_id,
                                error = ?join_error,
                                "Session actor panicked"
                            );
                        }
                    }
                }

                self.metrics.decrement_sessions();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{
        DEFAULT_CODE_LENGTH, DEFAULT_CODE_MAX_ATTEMPTS, DEFAULT_POLL_TIMER_SECONDS,
    };
    use crate::registry::SessionRegistry;
    use common::identity::StoreBackedIdentity;
    use common::memory::MemoryStore;

    fn test_config() -> Config {
        Config {
            health_bind_address: "127.0.0.1:0".to_string(),
            pc_id: "pc-test-001".to_string(),
            max_sessions: 4,
            code_length: DEFAULT_CODE_LENGTH,
            code_max_attempts: DEFAULT_CODE_MAX_ATTEMPTS,
            default_poll_timer_seconds: DEFAULT_POLL_TIMER_SECONDS,
        }
    }

    struct Fixture {
        handle: PollControllerHandle,
        store: Arc<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let store_dyn: Arc<dyn RecordStore> = Arc::clone(&store) as Arc<dyn RecordStore>;
        let identity: Arc<dyn CallerIdentity> =
            Arc::new(StoreBackedIdentity::new(Arc::clone(&store_dyn)));
        let metrics = ControllerMetrics::new();
        let bus = RoomBus::new(Arc::new(SessionRegistry::new()), Arc::clone(&metrics));

        let handle = PollControllerHandle::new(&test_config(), store_dyn, identity, bus, metrics);
        Fixture { handle, store }
    }

    #[tokio::test]
    async fn test_open_session_persists_and_spawns_actor() {
        let fx = fixture();
        let owner = UserId::new();

        let session = fx
            .handle
            .open_session(owner, "Standup".to_string())
            .await
            .unwrap();
        assert!(session.is_active);
        assert_eq!(session.session_code.len(), DEFAULT_CODE_LENGTH);

        let stored = fx
            .store
            .find_session_by_code(&session.session_code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, session.id);

        let resolved = fx
            .handle
            .resolve_session(session.session_code.clone())
            .await
            .unwrap();
        assert_eq!(resolved.session_id(), session.id);

        fx.handle.cancel();
    }

    #[tokio::test]
    async fn test_resolve_unknown_code_fails() {
        let fx = fixture();
        let result = fx.handle.resolve_session("ZZZZ99".to_string()).await;
        assert!(matches!(result, Err(PcError::SessionNotFound(_))));
        fx.handle.cancel();
    }

    #[tokio::test]
    async fn test_resolve_respawns_actor_for_stored_session() {
        let fx = fixture();
        let owner = UserId::new();

        // Session exists in the store but no actor runs for it, as after a
        // controller restart.
        let session = Session::new(owner, "QRSTUV".to_string(), "Recovered".to_string());
        fx.store.create_session(session.clone()).await.unwrap();

        let handle = fx
            .handle
            .resolve_session("QRSTUV".to_string())
            .await
            .unwrap();
        assert_eq!(handle.session_id(), session.id);

        let poll = handle
            .create_poll(
                owner,
                "Still works?".to_string(),
                vec!["Yes".to_string(), "No".to_string()],
                None,
                true,
            )
            .await
            .unwrap();
        assert_eq!(poll.session_id, session.id);

        fx.handle.cancel();
    }

    #[tokio::test]
    async fn test_resolve_ended_session_fails() {
        let fx = fixture();
        let mut session = Session::new(UserId::new(), "ENDED1".to_string(), "t".to_string());
        session.is_active = false;
        fx.store.create_session(session).await.unwrap();

        let result = fx.handle.resolve_session("ENDED1".to_string()).await;
        assert!(matches!(result, Err(PcError::SessionClosed(_))));
        fx.handle.cancel();
    }

    #[tokio::test]
    async fn test_resolve_poll_routes_to_owning_session() {
        let fx = fixture();
        let owner = UserId::new();
        let session = fx
            .handle
            .open_session(owner, "Routing".to_string())
            .await
            .unwrap();
        let session_handle = fx
            .handle
            .resolve_session(session.session_code.clone())
            .await
            .unwrap();
        let poll = session_handle
            .create_poll(
                owner,
                "Q".to_string(),
                vec!["A".to_string(), "B".to_string()],
                None,
                true,
            )
            .await
            .unwrap();

        let routed = fx.handle.resolve_poll(poll.id).await.unwrap();
        assert_eq!(routed.session_id(), session.id);

        let result = fx.handle.resolve_poll(PollId::new()).await;
        assert!(matches!(result, Err(PcError::PollNotFound(_))));
        fx.handle.cancel();
    }

    #[tokio::test]
    async fn test_session_capacity_limit() {
        let fx = fixture();
        let owner = UserId::new();

        for i in 0..4 {
            fx.handle
                .open_session(owner, format!("s{i}"))
                .await
                .unwrap();
        }

        let result = fx.handle.open_session(owner, "one too many".to_string()).await;
        assert!(matches!(
            result,
            Err(PcError::CapacityExceeded { limit: 4 })
        ));
        fx.handle.cancel();
    }

    #[tokio::test]
    async fn test_remove_session() {
        let fx = fixture();
        let owner = UserId::new();
        let session = fx
            .handle
            .open_session(owner, "Removable".to_string())
            .await
            .unwrap();

        fx.handle.remove_session(session.id).await.unwrap();

        let status = fx.handle.get_status().await.unwrap();
        assert_eq!(status.session_count, 0);

        let result = fx.handle.remove_session(session.id).await;
        assert!(matches!(result, Err(PcError::SessionNotFound(_))));
        fx.handle.cancel();
    }

    #[tokio::test]
    async fn test_status_counts_sessions() {
        let fx = fixture();
        let owner = UserId::new();

        let status = fx.handle.get_status().await.unwrap();
        assert_eq!(status.session_count, 0);
        assert!(!status.is_draining);

        fx.handle.open_session(owner, "a".to_string()).await.unwrap();
        fx.handle.open_session(owner, "b".to_string()).await.unwrap();

        let status = fx.handle.get_status().await.unwrap();
        assert_eq!(status.session_count, 2);
        fx.handle.cancel();
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_sessions() {
        let fx = fixture();

        fx.handle.shutdown(Duration::from_secs(30)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(fx.handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_ended_session_actor_is_reaped() {
        let fx = fixture();
        let owner = UserId::new();
        let session = fx
            .handle
            .open_session(owner, "Ends".to_string())
            .await
            .unwrap();
        let session_handle = fx
            .handle
            .resolve_session(session.session_code.clone())
            .await
            .unwrap();

        session_handle.end_session(owner).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The next controller message triggers the health check, reaping the
        // finished actor; the ended session then resolves as closed.
        let result = fx
            .handle
            .resolve_session(session.session_code.clone())
            .await;
        assert!(matches!(result, Err(PcError::SessionClosed(_))));

        let status = fx.handle.get_status().await.unwrap();
        assert_eq!(status.session_count, 0);
        fx.handle.cancel();
    }

    #[tokio::test]
    async fn test_owner_history_lists_owned_sessions() {
        let fx = fixture();
        let owner = UserId::new();

        let first = fx
            .handle
            .open_session(owner, "Monday".to_string())
            .await
            .unwrap();
        let second = fx
            .handle
            .open_session(owner, "Tuesday".to_string())
            .await
            .unwrap();
        fx.handle
            .open_session(UserId::new(), "Someone else's".to_string())
            .await
            .unwrap();

        // Ended sessions stay in the history.
        let handle = fx
            .handle
            .resolve_session(first.session_code.clone())
            .await
            .unwrap();
        handle.end_session(owner).await.unwrap();

        let history = fx.handle.owner_history(owner).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, first.id);
        assert_eq!(history[1].id, second.id);

        assert!(fx.handle.owner_history(UserId::new()).await.unwrap().is_empty());
        fx.handle.cancel();
    }

    #[tokio::test]
    async fn test_resolve_poll_after_session_end_reports_closed() {
        let fx = fixture();
        let owner = UserId::new();
        let session = fx
            .handle
            .open_session(owner, "Ends".to_string())
            .await
            .unwrap();
        let session_handle = fx
            .handle
            .resolve_session(session.session_code.clone())
            .await
            .unwrap();
        let poll = session_handle
            .create_poll(
                owner,
                "Q".to_string(),
                vec!["A".to_string(), "B".to_string()],
                None,
                true,
            )
            .await
            .unwrap();

        session_handle.end_session(owner).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let result = fx.handle.resolve_poll(poll.id).await;
        assert!(matches!(result, Err(PcError::SessionClosed(_))));
        fx.handle.cancel();
    }

    #[tokio::test]
    async fn test_revived_session_keeps_single_active_poll() {
        let fx = fixture();
        let owner = UserId::new();
        let session = fx
            .handle
            .open_session(owner, "Survives".to_string())
            .await
            .unwrap();
        let code = session.session_code.clone();
        let session_handle = fx.handle.resolve_session(code.clone()).await.unwrap();

        let first = session_handle
            .create_poll(
                owner,
                "First?".to_string(),
                vec!["A".to_string(), "B".to_string()],
                Some(300),
                true,
            )
            .await
            .unwrap();
        session_handle.launch_poll(owner, first.id).await.unwrap();

        // Drop the actor while its poll is still active, then revive.
        fx.handle.remove_session(session.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let revived = fx.handle.resolve_session(code.clone()).await.unwrap();

        let second = revived
            .create_poll(
                owner,
                "Second?".to_string(),
                vec!["A".to_string(), "B".to_string()],
                Some(300),
                true,
            )
            .await
            .unwrap();
        revived.launch_poll(owner, second.id).await.unwrap();

        let polls = fx.store.find_polls_by_session(session.id).await.unwrap();
        let active: Vec<_> = polls.iter().filter(|p| p.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);

        let first_stored = fx.store.find_poll_by_id(first.id).await.unwrap().unwrap();
        assert!(first_stored.closed_at.is_some());
        fx.handle.cancel();
    }
}
