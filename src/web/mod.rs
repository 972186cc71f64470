//! Local status surface
//!
//! Provides the current activity snapshot over REST and streams
//! notifications over a WebSocket, for game windows that prefer pulling.

pub mod routes;
pub mod ws;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::{ActivitySnapshot, Notification};

/// Shared state for the web server
pub struct AppState {
    /// Latest snapshot published by the engine
    pub snapshot: watch::Receiver<ActivitySnapshot>,
    /// Broadcast channel for notifications
    pub event_tx: broadcast::Sender<Notification>,
    /// Server start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(routes::get_status))
        .route("/ws/events", get(ws::ws_handler))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

/// Start the web server on localhost
pub async fn start_server(
    port: u16,
    snapshot: watch::Receiver<ActivitySnapshot>,
    event_tx: broadcast::Sender<Notification>,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        snapshot,
        event_tx,
        started_at: chrono::Utc::now(),
    });

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 Status server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
