//! `SessionActor` - per-session actor that owns the poll lifecycle.
//!
//! Each `SessionActor`:
//! - Owns all poll state transitions for one session (launch, close, timers)
//! - Serializes vote recording through its mailbox, so two concurrent votes
//!   on the same option can never lose an increment
//! - Publishes room events through the broadcast bus
//!
//! # Countdown handling
//!
//! Every launch spawns a dedicated timer task keyed by `(poll_id,
//! generation)`. Superseding or closing a poll cancels its timer task via a
//! child cancellation token; a `TimerFired` that still arrives with a stale
//! generation is logged and dropped. A poll therefore closes exactly once.

use crate::bus::RoomBus;
use crate::errors::PcError;
use crate::events::RoomEvent;

use super::messages::{JoinOutcome, SessionMessage, SessionState, VoteOutcome};
use super::metrics::ControllerMetrics;

use chrono::Utc;
use common::entities::{Participant, Poll, Session, Vote};
use common::identity::CallerIdentity;
use common::store::RecordStore;
use common::types::{ConnectionId, PollId, SessionId, UserId, VoteId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the session mailbox.
const SESSION_CHANNEL_BUFFER: usize = 500;

/// Handle to a `SessionActor`.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
    session_id: SessionId,
    session_code: String,
}

impl SessionHandle {
    /// Get the session ID.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Get the session join code.
    #[must_use]
    pub fn session_code(&self) -> &str {
        &self.session_code
    }

    /// Create a draft poll in this session.
    pub async fn create_poll(
        &self,
        caller: UserId,
        question: String,
        options: Vec<String>,
        timer_seconds: Option<u64>,
        allow_anonymous: bool,
    ) -> Result<Poll, PcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::CreatePoll {
                caller,
                question,
                options,
                timer_seconds,
                allow_anonymous,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Launch a poll, superseding any currently active one.
    pub async fn launch_poll(&self, caller: UserId, poll_id: PollId) -> Result<Poll, PcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::LaunchPoll {
                caller,
                poll_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Close a poll before its countdown expires. Idempotent on already
    /// closed polls.
    pub async fn close_poll(&self, caller: UserId, poll_id: PollId) -> Result<Poll, PcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::ClosePoll {
                caller,
                poll_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Record a vote on the active poll.
    pub async fn submit_vote(
        &self,
        poll_id: PollId,
        session_code: String,
        option_index: usize,
        voter_name: Option<String>,
        is_anonymous: bool,
    ) -> Result<VoteOutcome, PcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::SubmitVote {
                poll_id,
                session_code,
                option_index,
                voter_name,
                is_anonymous,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Join the session room with a per-connection event channel.
    pub async fn join_session(
        &self,
        connection_id: ConnectionId,
        name: Option<String>,
        is_anonymous: bool,
        event_sender: mpsc::Sender<RoomEvent>,
    ) -> Result<JoinOutcome, PcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::JoinSession {
                connection_id,
                name,
                is_anonymous,
                event_sender,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// End the session. Closes any active poll first.
    pub async fn end_session(&self, caller: UserId) -> Result<Session, PcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::EndSession {
                caller,
                respond_to: tx,
            })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Get the currently active poll, if any.
    pub async fn current_active(&self) -> Result<Option<Poll>, PcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::CurrentActive { respond_to: tx })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))
    }

    /// All polls of this session in creation order.
    pub async fn get_history(&self) -> Result<Vec<Poll>, PcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::GetHistory { respond_to: tx })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))?
    }

    /// Get current session state.
    pub async fn get_state(&self) -> Result<SessionState, PcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::GetState { respond_to: tx })
            .await
            .map_err(|e| PcError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| PcError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the session actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The currently running countdown, keyed by launch generation.
struct ActiveCountdown {
    poll_id: PollId,
    generation: u64,
    /// Cancelling this token stops the timer task without firing.
    timer_cancel: CancellationToken,
    timer_task: JoinHandle<()>,
}

/// The `SessionActor` implementation.
pub struct SessionActor {
    /// Session ID.
    session_id: SessionId,
    /// Session join code (immutable).
    session_code: String,
    /// Message receiver.
    receiver: mpsc::Receiver<SessionMessage>,
    /// Self-sender, cloned into timer tasks.
    self_sender: mpsc::Sender<SessionMessage>,
    /// Cancellation token (child of controller's token).
    cancel_token: CancellationToken,
    /// Record store for sessions, polls and votes.
    store: Arc<dyn RecordStore>,
    /// Ownership checks for privileged operations.
    identity: Arc<dyn CallerIdentity>,
    /// Room event publisher.
    bus: RoomBus,
    /// Countdown for the active poll, if any.
    active: Option<ActiveCountdown>,
    /// Monotonic launch counter. Bumped on every launch; stale timer
    /// messages carry an older value and are dropped.
    launch_generation: u64,
    /// Countdown applied when a poll is created without one.
    default_timer_seconds: u64,
    /// Whether the session actor is shutting down.
    is_shutting_down: bool,
    /// Shared controller metrics.
    metrics: Arc<ControllerMetrics>,
}

impl SessionActor {
    /// Spawn a new session actor for a persisted session record.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        session_id: SessionId,
        session_code: String,
        cancel_token: CancellationToken,
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn CallerIdentity>,
        bus: RoomBus,
        default_timer_seconds: u64,
        metrics: Arc<ControllerMetrics>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_BUFFER);

        let actor = Self {
            session_id,
            session_code: session_code.clone(),
            receiver,
            self_sender: sender.clone(),
            cancel_token: cancel_token.clone(),
            store,
            identity,
            bus,
            active: None,
            launch_generation: 0,
            default_timer_seconds,
            is_shutting_down: false,
            metrics,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = SessionHandle {
            sender,
            cancel_token,
            session_id,
            session_code,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "pc.actor.session", fields(session_code = %self.session_code))]
    async fn run(mut self) {
        info!(
            target: "pc.actor.session",
            session_id = %self.session_id,
            "SessionActor started"
        );

        self.resume_active_poll().await;

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "pc.actor.session",
                        session_id = %self.session_id,
                        "SessionActor received cancellation signal"
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
                                target: "pc.actor.session",
                                session_id = %self.session_id,
                                "SessionActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "pc.actor.session",
            session_id = %self.session_id,
            "SessionActor stopped"
        );
    }

    /// Handle a single message.
    async fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::CreatePoll {
                caller,
                question,
                options,
                timer_seconds,
                allow_anonymous,
                respond_to,
            } => {
                let result = self
                    .handle_create_poll(caller, question, options, timer_seconds, allow_anonymous)
                    .await;
                let _ = respond_to.send(result);
            }

            SessionMessage::LaunchPoll {
                caller,
                poll_id,
                respond_to,
            } => {
                let result = self.handle_launch_poll(caller, poll_id).await;
                let _ = respond_to.send(result);
            }

            SessionMessage::ClosePoll {
                caller,
                poll_id,
                respond_to,
            } => {
                let result = self.handle_close_poll(caller, poll_id).await;
                let _ = respond_to.send(result);
            }

            SessionMessage::TimerFired {
                poll_id,
                generation,
            } => {
                self.handle_timer_fired(poll_id, generation).await;
            }

            SessionMessage::SubmitVote {
                poll_id,
                session_code,
                option_index,
                voter_name,
                is_anonymous,
                respond_to,
            } => {
                let result = self
                    .handle_submit_vote(
                        poll_id,
                        &session_code,
                        option_index,
                        voter_name,
                        is_anonymous,
                    )
                    .await;
                let _ = respond_to.send(result);
            }

            SessionMessage::JoinSession {
                connection_id,
                name,
                is_anonymous,
                event_sender,
                respond_to,
            } => {
                let result = self
                    .handle_join(connection_id, name, is_anonymous, event_sender)
                    .await;
                let _ = respond_to.send(result);
            }

            SessionMessage::EndSession { caller, respond_to } => {
                let result = self.handle_end_session(caller).await;
                let _ = respond_to.send(result);
            }

            SessionMessage::CurrentActive { respond_to } => {
                let poll = self.current_active_poll().await;
                let _ = respond_to.send(poll);
            }

            SessionMessage::GetHistory { respond_to } => {
                let result = self
                    .store
                    .find_polls_by_session(self.session_id)
                    .await
                    .map_err(PcError::from);
                let _ = respond_to.send(result);
            }

            SessionMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.get_state());
            }
        }
    }

    /// Verify the caller owns this session.
    async fn authorize(&self, caller: UserId) -> Result<(), PcError> {
        if self.identity.is_owner(self.session_id, caller).await? {
            Ok(())
        } else {
            Err(PcError::NotAuthorized(
                "only the session owner may do this".to_string(),
            ))
        }
    }

    /// Load this actor's session record.
    async fn load_session(&self) -> Result<Session, PcError> {
        self.store
            .find_session_by_id(self.session_id)
            .await?
            .ok_or_else(|| PcError::SessionNotFound(self.session_code.clone()))
    }

    /// Load a poll and verify it belongs to this session.
    async fn load_owned_poll(&self, poll_id: PollId) -> Result<Poll, PcError> {
        let poll = self
            .store
            .find_poll_by_id(poll_id)
            .await?
            .ok_or_else(|| PcError::PollNotFound(poll_id.to_string()))?;
        if poll.session_id != self.session_id {
            return Err(PcError::SessionMismatch {
                session_code: self.session_code.clone(),
            });
        }
        Ok(poll)
    }

    /// Create a draft poll and announce it to the room.
    #[instrument(skip_all, fields(session_code = %self.session_code))]
    async fn handle_create_poll(
        &mut self,
        caller: UserId,
        question: String,
        options: Vec<String>,
        timer_seconds: Option<u64>,
        allow_anonymous: bool,
    ) -> Result<Poll, PcError> {
        if self.is_shutting_down {
            return Err(PcError::Draining);
        }
        self.authorize(caller).await?;

        let session = self.load_session().await?;
        if !session.is_active {
            return Err(PcError::SessionClosed(self.session_code.clone()));
        }

        if question.trim().is_empty() {
            return Err(PcError::InvalidPoll("question must not be empty".to_string()));
        }
        if options.len() < 2 {
            return Err(PcError::InvalidPoll(
                "a poll needs at least two options".to_string(),
            ));
        }

        let poll = Poll::new(
            self.session_id,
            question,
            options,
            timer_seconds.or(Some(self.default_timer_seconds)),
            allow_anonymous,
        );
        self.store.create_poll(poll.clone()).await?;

        self.bus
            .publish(&self.session_code, &RoomEvent::NewPoll(Box::new(poll.clone())));

        info!(
            target: "pc.actor.session",
            poll_id = %poll.id,
            options = poll.options.len(),
            timer_seconds = poll.timer_seconds,
            "Poll created"
        );

        Ok(poll)
    }

    /// Launch a poll: supersede any active one, activate, start countdown.
    #[instrument(skip_all, fields(session_code = %self.session_code, poll_id = %poll_id))]
    async fn handle_launch_poll(&mut self, caller: UserId, poll_id: PollId) -> Result<Poll, PcError> {
        if self.is_shutting_down {
            return Err(PcError::Draining);
        }
        self.authorize(caller).await?;

        let session = self.load_session().await?;
        if !session.is_active {
            return Err(PcError::SessionClosed(self.session_code.clone()));
        }

        let mut poll = self.load_owned_poll(poll_id).await?;
        match poll.state() {
            common::entities::PollState::Active => {
                return Err(PcError::Conflict("Poll is already active".to_string()));
            }
            common::entities::PollState::Closed => {
                return Err(PcError::Conflict("Poll has already closed".to_string()));
            }
            common::entities::PollState::Draft => {}
        }

        // Supersede: every previously active poll closes before the new one
        // activates, so at most one poll accepts votes at any instant. The
        // store sweep catches active polls this actor incarnation never
        // launched itself.
        if self.active.is_some() {
            self.close_active_poll("superseded").await?;
        }
        self.close_other_active_polls(poll_id, "superseded").await?;

        poll.is_launched = true;
        poll.is_active = true;
        poll.timer_started_at = Some(Utc::now());
        self.store.update_poll(poll.clone()).await?;

        self.arm_countdown(poll_id, Duration::from_secs(poll.timer_seconds));

        self.metrics.increment_polls_launched();
        self.bus
            .publish(&self.session_code, &RoomEvent::PollLaunched(poll_id));

        info!(
            target: "pc.actor.session",
            generation = self.launch_generation,
            timer_seconds = poll.timer_seconds,
            "Poll launched"
        );

        Ok(poll)
    }

    /// Explicit close. Idempotent: closing an already closed poll returns it
    /// unchanged.
    #[instrument(skip_all, fields(session_code = %self.session_code, poll_id = %poll_id))]
    async fn handle_close_poll(&mut self, caller: UserId, poll_id: PollId) -> Result<Poll, PcError> {
        self.authorize(caller).await?;

        if self.active.as_ref().is_some_and(|a| a.poll_id == poll_id) {
            return self.close_active_poll("explicit close").await;
        }

        let poll = self.load_owned_poll(poll_id).await?;
        match poll.state() {
            common::entities::PollState::Closed => Ok(poll),
            _ => Err(PcError::PollNotActive(poll_id.to_string())),
        }
    }

    /// Countdown expiry. Only the generation that launched the poll may
    /// close it; anything else is a cancelled or superseded timer arriving
    /// late.
    async fn handle_timer_fired(&mut self, poll_id: PollId, generation: u64) {
        let is_current = self
            .active
            .as_ref()
            .is_some_and(|a| a.poll_id == poll_id && a.generation == generation);

        if !is_current {
            debug!(
                target: "pc.actor.session",
                session_code = %self.session_code,
                poll_id = %poll_id,
                generation,
                current_generation = self.launch_generation,
                "Stale timer ignored"
            );
            return;
        }

        debug!(
            target: "pc.actor.session",
            session_code = %self.session_code,
            poll_id = %poll_id,
            "Countdown expired, closing poll"
        );

        if let Err(e) = self.close_active_poll("timer expired").await {
            warn!(
                target: "pc.actor.session",
                session_code = %self.session_code,
                poll_id = %poll_id,
                error = %e,
                "Failed to close poll on timer expiry"
            );
        }
    }

    /// Start a countdown for a newly activated poll under a fresh launch
    /// generation.
    fn arm_countdown(&mut self, poll_id: PollId, duration: Duration) {
        self.launch_generation += 1;
        let generation = self.launch_generation;

        let timer_cancel = self.cancel_token.child_token();
        let timer_token = timer_cancel.clone();
        let timer_sender = self.self_sender.clone();
        let timer_task = tokio::spawn(async move {
            tokio::select! {
                () = timer_token.cancelled() => {}
                () = tokio::time::sleep(duration) => {
                    let _ = timer_sender
                        .send(SessionMessage::TimerFired {
                            poll_id,
                            generation,
                        })
                        .await;
                }
            }
        });

        self.active = Some(ActiveCountdown {
            poll_id,
            generation,
            timer_cancel,
            timer_task,
        });
    }

    /// Close the currently active poll: stop its timer, persist the terminal
    /// state, broadcast `poll-closed`.
    async fn close_active_poll(&mut self, reason: &str) -> Result<Poll, PcError> {
        let countdown = self
            .active
            .take()
            .ok_or_else(|| PcError::Internal("no active poll to close".to_string()))?;

        countdown.timer_cancel.cancel();
        countdown.timer_task.abort();

        let poll = self.load_owned_poll(countdown.poll_id).await?;
        self.close_stored_poll(poll, reason).await
    }

    /// Persist a poll's terminal state and broadcast `poll-closed`.
    async fn close_stored_poll(&mut self, mut poll: Poll, reason: &str) -> Result<Poll, PcError> {
        poll.is_active = false;
        poll.closed_at = Some(Utc::now());
        self.store.update_poll(poll.clone()).await?;

        self.bus
            .publish(&self.session_code, &RoomEvent::PollClosed(poll.id));

        info!(
            target: "pc.actor.session",
            session_code = %self.session_code,
            poll_id = %poll.id,
            reason = %reason,
            total_votes = poll.total_votes(),
            "Poll closed"
        );

        Ok(poll)
    }

    /// Force-close any stored poll still marked active, except `keep`.
    ///
    /// The in-actor countdown only covers polls launched by this actor
    /// incarnation; a respawned actor can inherit older active polls from
    /// the store.
    async fn close_other_active_polls(
        &mut self,
        keep: PollId,
        reason: &str,
    ) -> Result<(), PcError> {
        let polls = self.store.find_polls_by_session(self.session_id).await?;
        for poll in polls.into_iter().filter(|p| p.is_active && p.id != keep) {
            self.close_stored_poll(poll, reason).await?;
        }
        Ok(())
    }

    /// Re-arm the countdown for a poll left active by a previous actor
    /// incarnation, or close it if its deadline has already passed.
    ///
    /// Runs once at actor startup, before any message is processed.
    async fn resume_active_poll(&mut self) {
        let polls = match self.store.find_polls_by_session(self.session_id).await {
            Ok(polls) => polls,
            Err(e) => {
                warn!(
                    target: "pc.actor.session",
                    session_id = %self.session_id,
                    error = %e,
                    "Failed to load polls on startup"
                );
                return;
            }
        };

        for poll in polls.into_iter().filter(|p| p.is_active) {
            if self.active.is_some() {
                // The store should hold at most one active poll per session;
                // anything beyond the first resumed one closes immediately.
                if let Err(e) = self.close_stored_poll(poll, "superseded").await {
                    warn!(
                        target: "pc.actor.session",
                        session_id = %self.session_id,
                        error = %e,
                        "Failed to close extra active poll on startup"
                    );
                }
                continue;
            }

            let elapsed = poll
                .timer_started_at
                .map(|started| (Utc::now() - started).num_seconds())
                .and_then(|secs| u64::try_from(secs).ok())
                .unwrap_or(0);
            let remaining = poll.timer_seconds.saturating_sub(elapsed);

            if remaining == 0 {
                if let Err(e) = self.close_stored_poll(poll, "timer expired").await {
                    warn!(
                        target: "pc.actor.session",
                        session_id = %self.session_id,
                        error = %e,
                        "Failed to close expired poll on startup"
                    );
                }
            } else {
                info!(
                    target: "pc.actor.session",
                    session_id = %self.session_id,
                    poll_id = %poll.id,
                    remaining_seconds = remaining,
                    "Resuming countdown for stored active poll"
                );
                self.arm_countdown(poll.id, Duration::from_secs(remaining));
            }
        }
    }

    /// Record a vote on the active poll and broadcast updated tallies.
    ///
    /// Runs on the actor task, so increments on the same poll are applied
    /// one at a time regardless of how many clients submit concurrently.
    async fn handle_submit_vote(
        &mut self,
        poll_id: PollId,
        session_code: &str,
        option_index: usize,
        voter_name: Option<String>,
        is_anonymous: bool,
    ) -> Result<VoteOutcome, PcError> {
        if session_code != self.session_code {
            return Err(PcError::SessionMismatch {
                session_code: session_code.to_string(),
            });
        }

        let mut poll = self.load_owned_poll(poll_id).await?;

        let accepting = self.active.as_ref().is_some_and(|a| a.poll_id == poll_id);
        if !accepting || !poll.is_active {
            return Err(PcError::PollNotActive(poll_id.to_string()));
        }
        if is_anonymous && !poll.allow_anonymous {
            return Err(PcError::NotAuthorized(
                "anonymous voting is disabled for this poll".to_string(),
            ));
        }

        let option_count = poll.options.len();
        let option = poll
            .options
            .get_mut(option_index)
            .ok_or(PcError::InvalidOptionIndex {
                index: option_index,
                option_count,
            })?;
        option.votes += 1;

        let now = Utc::now();
        let response_time_ms = poll
            .timer_started_at
            .map(|started| (now - started).num_milliseconds())
            .unwrap_or_default();

        let vote = Vote {
            id: VoteId::new(),
            poll_id,
            session_id: self.session_id,
            option_index,
            voter_name: if is_anonymous { None } else { voter_name },
            is_anonymous,
            voted_at: now,
            response_time_ms,
        };

        self.store.update_poll(poll.clone()).await?;
        self.store.create_vote(vote.clone()).await?;

        self.metrics.increment_votes_recorded();
        self.bus.publish(
            &self.session_code,
            &RoomEvent::ResultsUpdated(Box::new(poll.clone())),
        );

        debug!(
            target: "pc.actor.session",
            session_code = %self.session_code,
            poll_id = %poll_id,
            option_index,
            total_votes = poll.total_votes(),
            "Vote recorded"
        );

        Ok(VoteOutcome { poll, vote })
    }

    /// Register a connection in the room and append a participant record.
    #[instrument(skip_all, fields(session_code = %self.session_code))]
    async fn handle_join(
        &mut self,
        connection_id: ConnectionId,
        name: Option<String>,
        is_anonymous: bool,
        event_sender: mpsc::Sender<RoomEvent>,
    ) -> Result<JoinOutcome, PcError> {
        if self.is_shutting_down {
            return Err(PcError::Draining);
        }

        let mut session = self.load_session().await?;
        if !session.is_active {
            return Err(PcError::SessionClosed(self.session_code.clone()));
        }

        let occupancy = self
            .bus
            .join_room(&self.session_code, connection_id, event_sender);

        session
            .participants
            .push(Participant::new(name, is_anonymous, Utc::now()));
        self.store.update_session(session.clone()).await?;

        info!(
            target: "pc.actor.session",
            occupancy,
            participants = session.participants.len(),
            "Participant joined session"
        );

        Ok(JoinOutcome { session, occupancy })
    }

    /// End the session: close any active poll, mark the record terminal,
    /// cancel the actor.
    #[instrument(skip_all, fields(session_code = %self.session_code))]
    async fn handle_end_session(&mut self, caller: UserId) -> Result<Session, PcError> {
        self.authorize(caller).await?;

        let mut session = self.load_session().await?;
        if !session.is_active {
            return Ok(session);
        }

        if self.active.is_some() {
            self.close_active_poll("session ended").await?;
        }

        session.is_active = false;
        session.ended_at = Some(Utc::now());
        self.store.update_session(session.clone()).await?;

        self.is_shutting_down = true;
        self.cancel_token.cancel();

        info!(
            target: "pc.actor.session",
            participants = session.participants.len(),
            "Session ended"
        );

        Ok(session)
    }

    /// Snapshot of the active poll, if any.
    async fn current_active_poll(&self) -> Option<Poll> {
        let poll_id = self.active.as_ref()?.poll_id;
        match self.store.find_poll_by_id(poll_id).await {
            Ok(poll) => poll,
            Err(e) => {
                warn!(
                    target: "pc.actor.session",
                    session_code = %self.session_code,
                    poll_id = %poll_id,
                    error = %e,
                    "Failed to load active poll"
                );
                None
            }
        }
    }

    /// Current session state.
    fn get_state(&self) -> SessionState {
        SessionState {
            session_id: self.session_id,
            session_code: self.session_code.clone(),
            active_poll_id: self.active.as_ref().map(|a| a.poll_id),
            launch_generation: self.launch_generation,
            participant_count: self.bus.registry().occupancy(&self.session_code),
            is_shutting_down: self.is_shutting_down,
        }
    }

    /// Perform graceful shutdown. Stops the countdown without closing the
    /// poll record; a controller restart resumes from persisted state.
    async fn graceful_shutdown(&mut self) {
        self.is_shutting_down = true;

        if let Some(countdown) = self.active.take() {
            countdown.timer_cancel.cancel();
            match tokio::time::timeout(Duration::from_secs(5), countdown.timer_task).await {
                Ok(_) => {}
                Err(_) => {
                    warn!(
                        target: "pc.actor.session",
                        session_code = %self.session_code,
                        "Timer task shutdown timed out"
                    );
                }
            }
        }

        info!(
            target: "pc.actor.session",
            session_code = %self.session_code,
            "Graceful shutdown complete"
        );
    }
}
