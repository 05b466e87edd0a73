// Presentation feed: read-only HTTP + WebSocket access to the dashboard state

mod http;
mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::PublishingConfig;
use crate::store::DashboardStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<DashboardStore>,
    pub(crate) ws_state_connections: Arc<AtomicUsize>,
    pub(crate) ws_ping_interval: Duration,
}

pub fn app(
    store: Arc<DashboardStore>,
    ws_state_connections: Arc<AtomicUsize>,
    publishing: &PublishingConfig,
) -> Router {
    let state = AppState {
        store,
        ws_state_connections,
        ws_ping_interval: Duration::from_secs(publishing.ws_ping_interval_secs),
    };
    Router::new()
        .route("/", get(|| async { "opsboard: dashboard core running" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/state", get(http::state_handler)) // GET /api/state
        .route("/api/transitions", get(http::transitions_handler)) // GET /api/transitions
        .route("/ws/state", get(ws::ws_state)) // WS /ws/state
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
