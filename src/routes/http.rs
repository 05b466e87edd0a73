// GET handlers: version, state, transitions

use axum::{extract::State, response::IntoResponse};

use super::AppState;
use crate::version::{NAME, VERSION};

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/state: current dashboard state; `latest` is null until the first commit.
pub(super) async fn state_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(state.store.state())
}

/// GET /api/transitions: transitions from the most recent commit.
pub(super) async fn transitions_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(state.store.transitions())
}
