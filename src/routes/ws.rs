// WebSocket state stream

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::DashboardState;
use crate::store::StateSubscription;

pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements the /ws/state connection count on drop (connect = +1, drop = -1).
struct WsStateGuard(Arc<AtomicUsize>);

impl Drop for WsStateGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
    }
}

pub(super) async fn ws_state(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let subscription = state.store.subscribe();
    let conn_count = state.ws_state_connections.clone();
    let ping_every = state.ws_ping_interval;
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_state(socket, subscription, conn_count, ping_every).await {
            tracing::info!("State stream error: {}", e);
        }
    })
}

/// Returns false when the client is gone or too slow.
async fn send_json(socket: &mut WebSocket, state: &DashboardState) -> anyhow::Result<bool> {
    let json = serde_json::to_string(state)?;
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    Ok(matches!(r, Ok(Ok(()))))
}

async fn stream_state(
    mut socket: WebSocket,
    mut subscription: StateSubscription,
    conn_count: Arc<AtomicUsize>,
    ping_every: Duration,
) -> anyhow::Result<()> {
    conn_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let _guard = WsStateGuard(conn_count);
    tracing::debug!("Client connected to state stream");

    let current = subscription.current();
    if !send_json(&mut socket, &current).await? {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(ping_every);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ping_interval.tick().await;
    loop {
        tokio::select! {
            next = subscription.changed() => {
                let Some(state) = next else { break };
                if !send_json(&mut socket, &state).await? {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    tracing::debug!("Client disconnected from state stream");
    Ok(())
}
