//! Wired-up controller harness for integration tests.
//!
//! `TestHarness` assembles the full production wiring (in-memory store,
//! session registry, room bus, controller actor) so tests exercise the same
//! code paths the service runs, minus the network surface.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use common::identity::StoreBackedIdentity;
use common::memory::MemoryStore;
use common::store::RecordStore;
use poll_controller::actors::{ControllerMetrics, PollControllerHandle};
use poll_controller::bus::RoomBus;
use poll_controller::config::Config;
use poll_controller::events::RoomEvent;
use poll_controller::registry::SessionRegistry;

/// Default per-connection event channel capacity for test subscribers.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// How long `EventCollector::next` waits before declaring no event arrived.
const EVENT_WAIT: Duration = Duration::from_secs(1);

/// A fully wired Poll Controller for tests.
///
/// Holds the shared store and bus so tests can both drive the controller
/// through its handle and inspect persisted state directly.
pub struct TestHarness {
    /// The in-memory record store backing the controller.
    pub store: Arc<MemoryStore>,
    /// The connection registry the bus fans out through.
    pub registry: Arc<SessionRegistry>,
    /// The room event bus.
    pub bus: RoomBus,
    /// Handle to the running controller actor.
    pub controller: PollControllerHandle,
    /// Controller metrics, for asserting gauges and counters.
    pub metrics: Arc<ControllerMetrics>,
}

impl TestHarness {
    /// Create a harness with the default test configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Self::test_config())
    }

    /// Create a harness with a caller-supplied configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let store_dyn: Arc<dyn RecordStore> = store.clone();
        let identity = Arc::new(StoreBackedIdentity::new(store_dyn.clone()));
        let registry = Arc::new(SessionRegistry::new());
        let metrics = ControllerMetrics::new();
        let bus = RoomBus::new(registry.clone(), metrics.clone());

        let controller =
            PollControllerHandle::new(&config, store_dyn, identity, bus.clone(), metrics.clone());

        Self {
            store,
            registry,
            bus,
            controller,
            metrics,
        }
    }

    /// The configuration used by `new()`.
    #[must_use]
    pub fn test_config() -> Config {
        Config {
            health_bind_address: "127.0.0.1:0".to_string(),
            pc_id: "pc-test-001".to_string(),
            max_sessions: 100,
            code_length: 6,
            code_max_attempts: 32,
            default_poll_timer_seconds: 30,
        }
    }

    /// Subscribe a fresh event collector channel suitable for
    /// `SessionHandle::join_session`.
    #[must_use]
    pub fn event_channel() -> (mpsc::Sender<RoomEvent>, EventCollector) {
        EventCollector::channel(EVENT_CHANNEL_CAPACITY)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives room events pushed to one joined connection.
pub struct EventCollector {
    receiver: mpsc::Receiver<RoomEvent>,
}

impl EventCollector {
    /// Create a sender/collector pair with the given channel capacity.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<RoomEvent>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self { receiver })
    }

    /// Wait up to one second for the next event.
    ///
    /// Returns `None` if nothing arrives in time or the sender closed.
    pub async fn next(&mut self) -> Option<RoomEvent> {
        tokio::time::timeout(EVENT_WAIT, self.receiver.recv())
            .await
            .ok()
            .flatten()
    }

    /// Pop an already-delivered event without waiting.
    pub fn try_next(&mut self) -> Option<RoomEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drain every event already sitting in the channel.
    pub fn drain(&mut self) -> Vec<RoomEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait for an event matching `predicate`, discarding others.
    ///
    /// Panics if no matching event arrives within one second.
    pub async fn wait_for(&mut self, predicate: impl Fn(&RoomEvent) -> bool) -> RoomEvent {
        loop {
            match self.next().await {
                Some(event) if predicate(&event) => return event,
                Some(_) => continue,
                None => panic!("no matching room event arrived within {EVENT_WAIT:?}"),
            }
        }
    }
}
