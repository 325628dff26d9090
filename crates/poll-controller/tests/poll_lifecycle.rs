//! Integration tests for the poll lifecycle.
//!
//! Drives the full controller wiring (controller actor, session actors,
//! room bus, in-memory store) through open, join, launch, vote, and the
//! countdown-driven auto-close.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::time::Duration;

use common::entities::PollState;
use common::store::RecordStore;
use common::types::ConnectionId;
use poll_controller::events::RoomEvent;

use pc_test_utils::{TestHarness, TestOwner, TestPoll};

/// Let the actor process everything already in its mailbox.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn full_lifecycle_launch_vote_and_auto_close() {
    let harness = TestHarness::new();
    let owner = TestOwner::new();

    let session = harness
        .controller
        .open_session(owner.user_id, "Color vote".to_string())
        .await
        .unwrap();
    let code = session.session_code.clone();

    let room = harness.controller.resolve_session(code.clone()).await.unwrap();

    // Two audience members join and start receiving room events.
    let (alice_tx, mut alice_events) = TestHarness::event_channel();
    let (bob_tx, mut bob_events) = TestHarness::event_channel();
    room.join_session(ConnectionId::new(), Some("Alice".to_string()), false, alice_tx)
        .await
        .unwrap();
    let join = room
        .join_session(ConnectionId::new(), Some("Bob".to_string()), false, bob_tx)
        .await
        .unwrap();
    assert_eq!(join.occupancy, 2);

    let def = TestPoll::new("Favorite color?")
        .with_options(&["Red", "Blue"])
        .with_timer(5);
    let poll = room
        .create_poll(
            owner.user_id,
            def.question,
            def.options,
            def.timer_seconds,
            def.allow_anonymous,
        )
        .await
        .unwrap();
    assert_eq!(poll.state(), PollState::Draft);

    let launched = room.launch_poll(owner.user_id, poll.id).await.unwrap();
    assert_eq!(launched.state(), PollState::Active);
    assert!(launched.timer_started_at.is_some());

    // Votes land one second into the countdown.
    tokio::time::advance(Duration::from_secs(1)).await;
    room.submit_vote(poll.id, code.clone(), 0, Some("Alice".to_string()), false)
        .await
        .unwrap();
    room.submit_vote(poll.id, code.clone(), 1, Some("Bob".to_string()), false)
        .await
        .unwrap();
    let outcome = room
        .submit_vote(poll.id, code.clone(), 1, None, true)
        .await
        .unwrap();
    assert_eq!(outcome.poll.options[0].votes, 1);
    assert_eq!(outcome.poll.options[1].votes, 2);
    assert!(outcome.vote.response_time_ms >= 0);

    // Countdown expires; the poll closes itself.
    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;

    let stored = harness.store.find_poll_by_id(poll.id).await.unwrap().unwrap();
    assert_eq!(stored.state(), PollState::Closed);
    assert!(stored.closed_at.is_some());
    assert_eq!(stored.options[0].votes, 1);
    assert_eq!(stored.options[1].votes, 2);

    // Both subscribers saw the same lifecycle in order, with exactly one
    // close for the poll.
    for events in [alice_events.drain(), bob_events.drain()] {
        let launched_at = events
            .iter()
            .position(|e| matches!(e, RoomEvent::PollLaunched(id) if *id == poll.id))
            .unwrap();
        let closes: Vec<usize> = events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| {
                matches!(e, RoomEvent::PollClosed(id) if *id == poll.id).then_some(i)
            })
            .collect();
        assert_eq!(closes.len(), 1, "expected exactly one close event");
        assert!(launched_at < closes[0]);
    }
}

#[tokio::test(start_paused = true)]
async fn vote_after_close_is_rejected_without_side_effects() {
    let harness = TestHarness::new();
    let owner = TestOwner::new();

    let session = harness
        .controller
        .open_session(owner.user_id, "Quick check".to_string())
        .await
        .unwrap();
    let code = session.session_code.clone();
    let room = harness.controller.resolve_session(code.clone()).await.unwrap();

    let def = TestPoll::new("Ship it?").with_timer(3);
    let poll = room
        .create_poll(
            owner.user_id,
            def.question,
            def.options,
            def.timer_seconds,
            def.allow_anonymous,
        )
        .await
        .unwrap();
    room.launch_poll(owner.user_id, poll.id).await.unwrap();

    room.submit_vote(poll.id, code.clone(), 0, None, true)
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(4)).await;
    settle().await;

    let err = room
        .submit_vote(poll.id, code.clone(), 0, None, true)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not active"), "got: {err}");

    let stored = harness.store.find_poll_by_id(poll.id).await.unwrap().unwrap();
    assert_eq!(stored.total_votes(), 1);
    assert_eq!(
        harness.store.find_votes_by_poll(poll.id).await.unwrap().len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn superseding_launch_closes_prior_and_ignores_its_timer() {
    let harness = TestHarness::new();
    let owner = TestOwner::new();

    let session = harness
        .controller
        .open_session(owner.user_id, "Back to back".to_string())
        .await
        .unwrap();
    let code = session.session_code.clone();
    let room = harness.controller.resolve_session(code.clone()).await.unwrap();

    let first = room
        .create_poll(owner.user_id, "First?".to_string(), two(), Some(5), true)
        .await
        .unwrap();
    let second = room
        .create_poll(owner.user_id, "Second?".to_string(), two(), Some(10), true)
        .await
        .unwrap();

    room.launch_poll(owner.user_id, first.id).await.unwrap();
    tokio::time::advance(Duration::from_secs(2)).await;
    room.launch_poll(owner.user_id, second.id).await.unwrap();
    settle().await;

    // First closed at supersession, before the second's countdown began.
    let first_stored = harness.store.find_poll_by_id(first.id).await.unwrap().unwrap();
    let second_stored = harness.store.find_poll_by_id(second.id).await.unwrap().unwrap();
    assert_eq!(first_stored.state(), PollState::Closed);
    assert_eq!(second_stored.state(), PollState::Active);
    assert!(first_stored.closed_at.unwrap() <= second_stored.timer_started_at.unwrap());

    // Ride past the first poll's original deadline. Its cancelled timer
    // must not close the second poll early.
    tokio::time::advance(Duration::from_secs(4)).await;
    settle().await;
    let second_stored = harness.store.find_poll_by_id(second.id).await.unwrap().unwrap();
    assert_eq!(second_stored.state(), PollState::Active);

    // The second closes on its own countdown.
    tokio::time::advance(Duration::from_secs(6)).await;
    settle().await;
    let second_stored = harness.store.find_poll_by_id(second.id).await.unwrap().unwrap();
    assert_eq!(second_stored.state(), PollState::Closed);
}

#[tokio::test(start_paused = true)]
async fn at_most_one_poll_active_per_session() {
    let harness = TestHarness::new();
    let owner = TestOwner::new();

    let session = harness
        .controller
        .open_session(owner.user_id, "One at a time".to_string())
        .await
        .unwrap();
    let room = harness
        .controller
        .resolve_session(session.session_code.clone())
        .await
        .unwrap();

    let mut ids = Vec::new();
    for i in 0..3 {
        let poll = room
            .create_poll(owner.user_id, format!("Poll {i}?"), two(), Some(30), true)
            .await
            .unwrap();
        room.launch_poll(owner.user_id, poll.id).await.unwrap();
        ids.push(poll.id);
    }
    settle().await;

    let polls = harness.store.find_polls_by_session(session.id).await.unwrap();
    let active: Vec<_> = polls.iter().filter(|p| p.is_active).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, ids[2]);

    let current = room.current_active().await.unwrap().unwrap();
    assert_eq!(current.id, ids[2]);
}

#[tokio::test]
async fn closed_poll_cannot_be_relaunched() {
    let harness = TestHarness::new();
    let owner = TestOwner::new();

    let session = harness
        .controller
        .open_session(owner.user_id, "No reruns".to_string())
        .await
        .unwrap();
    let room = harness
        .controller
        .resolve_session(session.session_code.clone())
        .await
        .unwrap();

    let poll = room
        .create_poll(owner.user_id, "Once only?".to_string(), two(), Some(30), true)
        .await
        .unwrap();
    room.launch_poll(owner.user_id, poll.id).await.unwrap();
    room.close_poll(owner.user_id, poll.id).await.unwrap();

    let err = room.launch_poll(owner.user_id, poll.id).await.unwrap_err();
    assert!(err.to_string().contains("already closed"), "got: {err}");
}

#[tokio::test]
async fn resolve_poll_routes_to_owning_session() {
    let harness = TestHarness::new();
    let owner = TestOwner::new();

    let session = harness
        .controller
        .open_session(owner.user_id, "Routing".to_string())
        .await
        .unwrap();
    let room = harness
        .controller
        .resolve_session(session.session_code.clone())
        .await
        .unwrap();
    let poll = room
        .create_poll(owner.user_id, "Route me?".to_string(), two(), None, true)
        .await
        .unwrap();

    let routed = harness.controller.resolve_poll(poll.id).await.unwrap();
    assert_eq!(routed.session_code(), session.session_code);
}

fn two() -> Vec<String> {
    vec!["Yes".to_string(), "No".to_string()]
}
