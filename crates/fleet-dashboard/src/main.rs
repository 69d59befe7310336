//! # Drone Fleet Monitor
//!
//! Main entry point for the fleet monitor. Connects to the telemetry feed,
//! runs the monitoring session that keeps the map in step with the fleet,
//! and serves the dashboard read views and operator actions over HTTP.

mod config;
mod error;
mod handlers;
mod routes;
mod session;
mod state;
mod timers;

use crate::config::DashboardConfig;
use crate::routes::create_router;
use crate::session::Session;
use crate::state::AppState;
use crate::timers::TokioTimers;

use fleet_channel::TelemetryChannel;
use fleet_telemetry::MetricsCollector;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Channel event buffer between the feed and the session
const CHANNEL_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("🚁 Starting Drone Fleet Monitor v{}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = DashboardConfig::from_env();
    info!("Configuration loaded");
    info!("   API Port: {}", config.api_port);
    info!("   Telemetry feed: {}", config.channel.url);
    info!("   Online prefix: {}", config.status_prefix);
    if config.map_access_token.is_none() {
        warn!("   Map access token: not set");
    }

    let metrics = Arc::new(MetricsCollector::new()?);

    // Session
    let (tick_tx, tick_rx) = mpsc::unbounded_channel();
    let (session, handle) = Session::new(&config, TokioTimers::new(tick_tx), tick_rx, metrics.clone());

    let (event_tx, event_rx) = mpsc::channel(CHANNEL_BUFFER);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let session_task = tokio::spawn(session.run(event_rx, async move {
        let _ = stop_rx.await;
    }));

    // Telemetry feed
    let channel = TelemetryChannel::new(config.channel.clone());
    let channel_task = tokio::spawn(async move {
        if let Err(e) = channel.run(event_tx).await {
            error!("Telemetry channel stopped: {}", e);
        }
    });

    // API server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let app = create_router(AppState::new(config, handle, metrics));

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("🚀 API server listening on http://{}", addr);
    info!("Metrics available at http://{}/metrics", addr);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    channel_task.abort();
    let _ = stop_tx.send(());
    session_task.await?;

    info!("🛑 Server shutdown complete");
    Ok(())
}

/// Initialize logging with tracing
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,fleet_dashboard=debug,fleet_channel=debug,fleet_render=info")
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        }
    }
}
