//! Poll Controller
//!
//! Stateful orchestration server for live audience polls.
//!
//! # Servers
//!
//! - HTTP server for health endpoints and Prometheus metrics
//!   (default: 0.0.0.0:8081)
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Initialize the record store and room registry
//! 4. Initialize the actor system (`PollControllerHandle`)
//! 5. Start health HTTP server (liveness, readiness, metrics)
//! 6. Wait for shutdown signal

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use common::identity::{CallerIdentity, StoreBackedIdentity};
use common::memory::MemoryStore;
use common::store::RecordStore;
use metrics_exporter_prometheus::PrometheusBuilder;
use poll_controller::actors::{ControllerMetrics, PollControllerHandle};
use poll_controller::bus::RoomBus;
use poll_controller::config::Config;
use poll_controller::observability::{health_router, HealthState};
use poll_controller::registry::SessionRegistry;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "poll_controller=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Poll Controller");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        pc_id = %config.pc_id,
        health_bind_address = %config.health_bind_address,
        max_sessions = config.max_sessions,
        code_length = config.code_length,
        default_poll_timer_seconds = config.default_poll_timer_seconds,
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder before any metrics are recorded
    info!("Initializing Prometheus metrics recorder...");
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus metrics recorder")?;
    info!("Prometheus metrics recorder initialized");

    // Initialize health state
    let health_state = Arc::new(HealthState::new());

    // Initialize record store and room infrastructure. The in-memory store
    // is the only backend wired up today; a database-backed implementation
    // plugs in behind the same trait.
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let identity: Arc<dyn CallerIdentity> =
        Arc::new(StoreBackedIdentity::new(Arc::clone(&store)));
    let registry = Arc::new(SessionRegistry::new());
    let controller_metrics = ControllerMetrics::new();
    let bus = RoomBus::new(Arc::clone(&registry), Arc::clone(&controller_metrics));

    // Initialize actor system
    info!("Initializing actor system...");
    let controller_handle = PollControllerHandle::new(
        &config,
        store,
        identity,
        bus,
        Arc::clone(&controller_metrics),
    );
    info!("Actor system initialized");

    // Start health HTTP server (must succeed, fail startup if it doesn't)
    let health_addr: SocketAddr = config
        .health_bind_address
        .parse()
        .with_context(|| format!("Invalid health bind address {}", config.health_bind_address))?;

    let health_router = health_router(Arc::clone(&health_state));

    // Add /metrics endpoint served by the Prometheus exporter
    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );

    let app = health_router.merge(metrics_router);

    // Bind the listener before spawning to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(health_addr)
        .await
        .with_context(|| format!("Failed to bind health server to {health_addr}"))?;
    info!(addr = %health_addr, "Health server bound successfully");

    let health_shutdown_token = controller_handle.child_token();
    tokio::spawn(async move {
        info!(addr = %health_addr, "Health server starting");
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            health_shutdown_token.cancelled().await;
            info!("Health server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Health server failed");
        }
    });
    info!(addr = %health_addr, "Health server started");

    health_state.set_ready();

    // Wait for shutdown signal
    info!("Poll Controller running - press Ctrl+C to shutdown");
    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Mark as not ready immediately so k8s stops sending traffic
    health_state.set_not_ready();

    // Shut down the actor system; this cancels the root token, which drains
    // every session actor and stops the health server.
    if let Err(e) = controller_handle.shutdown(Duration::from_secs(30)).await {
        warn!(error = %e, "Actor system shutdown error");
    }

    // Give background tasks time to finish
    tokio::time::sleep(Duration::from_secs(2)).await;

    info!("Poll Controller shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable because
/// without signal handlers, we cannot gracefully shut down the service.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
