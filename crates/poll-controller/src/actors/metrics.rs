//! Shared controller metrics.
//!
//! Atomic counters read by health reporting and snapshotted into the
//! Prometheus exporter. All metrics are emitted with the `pc_` prefix.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Counters shared between the controller and its session actors.
#[derive(Debug, Default)]
pub struct ControllerMetrics {
    /// Live session actors.
    sessions: AtomicUsize,
    /// Connections registered across all rooms.
    connections: AtomicUsize,
    /// Polls launched since startup.
    polls_launched: AtomicU64,
    /// Votes recorded since startup.
    votes_recorded: AtomicU64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sessions: usize,
    pub connections: usize,
    pub polls_launched: u64,
    pub votes_recorded: u64,
}

impl ControllerMetrics {
    /// Create zeroed metrics.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn increment_sessions(&self) {
        let value = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::gauge!("pc_sessions_active").set(value as f64);
    }

    pub fn decrement_sessions(&self) {
        let value = self.sessions.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        metrics::gauge!("pc_sessions_active").set(value as f64);
    }

    pub fn increment_connections(&self) {
        let value = self.connections.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::gauge!("pc_connections_active").set(value as f64);
    }

    pub fn decrement_connections(&self) {
        let value = self.connections.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        metrics::gauge!("pc_connections_active").set(value as f64);
    }

    pub fn increment_polls_launched(&self) {
        self.polls_launched.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("pc_polls_launched_total").increment(1);
    }

    pub fn increment_votes_recorded(&self) {
        self.votes_recorded.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("pc_votes_recorded_total").increment(1);
    }

    /// Current counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions: self.sessions.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            polls_launched: self.polls_launched.load(Ordering::Relaxed),
            votes_recorded: self.votes_recorded.load(Ordering::Relaxed),
        }
    }
}
