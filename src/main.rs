//! Blasterz peer - headless two-peer arena shooter simulation
//!
//! Runs one side of a peer link:
//! - `host` serves the WebSocket endpoint and relays shared environment state
//! - `join` connects to a host
//! - `solo` runs the simulation with no link at all

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blasterz_peer::app::AppState;
use blasterz_peer::config::{Config, PeerRole};
use blasterz_peer::game::{ArenaLevel, FrameInput, Session, UiEvent};
use blasterz_peer::http::build_router;
use blasterz_peer::util::time::{frame_duration, init_process_time};
use blasterz_peer::ws::{client, LinkEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    init_process_time();

    info!(
        role = ?config.role,
        name = %config.player_name,
        mode = %config.session.mode,
        seed = config.session.seed,
        "Starting Blasterz peer"
    );

    let (link_tx, link_rx) = mpsc::unbounded_channel::<LinkEvent>();

    match config.role {
        PeerRole::Host => {
            let state = AppState::new(config.clone(), link_tx);
            let router = build_router(state);

            let addr: SocketAddr = config.server_addr;
            let listener = TcpListener::bind(addr).await?;

            info!("Host listening on {}", addr);
            info!("Health check: http://{}/health", addr);
            info!("WebSocket endpoint: ws://{}/ws", addr);

            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, router).await {
                    error!(error = %e, "Host server stopped");
                }
            });
        }
        PeerRole::Join => {
            let url = config
                .peer_url
                .as_deref()
                .context("PEER_URL is required to join")?;
            client::connect(url, link_tx)
                .await
                .with_context(|| format!("failed to join {url}"))?;
        }
        PeerRole::Solo => {
            drop(link_tx);
        }
    }

    let level = ArenaLevel::new(config.session.seed);
    let session = Session::new(config.session.clone(), Box::new(level));

    tokio::select! {
        _ = run_frame_loop(session, link_rx, config.frame_rate) => {}
        _ = shutdown_signal() => {}
    }

    info!("Peer shutdown complete");
    Ok(())
}

/// Fixed-rate frame loop. Inbound link events are drained into the session
/// every frame; nothing here blocks on the network.
async fn run_frame_loop(
    mut session: Session,
    mut link_rx: mpsc::UnboundedReceiver<LinkEvent>,
    frame_rate: u32,
) {
    let mut ticker = interval(frame_duration(frame_rate));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Headless: the local entity idles
    let input = FrameInput::default();
    let mut last = Instant::now();

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        while let Ok(event) = link_rx.try_recv() {
            session.enqueue(event);
        }

        session.tick(dt, &input);

        for event in session.drain_events() {
            log_ui_event(&event);
        }
    }
}

/// Stand-in presentation layer
fn log_ui_event(event: &UiEvent) {
    let payload = serde_json::to_string(event).unwrap_or_default();
    if event.is_periodic() {
        debug!(target: "ui", "{payload}");
    } else {
        info!(target: "ui", "{payload}");
    }
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
