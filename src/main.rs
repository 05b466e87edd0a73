use anyhow::Result;
use opsboard::*;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        environment = ?app_config.backend.environment,
        base_url = %app_config.base_url(),
        "Polling backend"
    );

    let request_timeout = Duration::from_millis(app_config.backend.request_timeout_ms);
    let source = backend::HttpStatusSource::new(app_config.base_url(), request_timeout)?;
    let aggregator = Arc::new(aggregator::SnapshotAggregator::new(source, request_timeout));
    let store = Arc::new(store::DashboardStore::new());

    let scheduler = scheduler::PollScheduler::start(
        aggregator,
        store.clone(),
        app_config.polling.scheduler_config(),
        |snapshot, transitions| {
            for t in transitions {
                tracing::debug!(entity = %t.key, from = ?t.from, to = ?t.to, "transition");
                if t.key == change::EntityKey::Archive
                    && t.to == Some(change::EntityState::Liveness(classify::Liveness::Down))
                {
                    for reason in snapshot.soft_degradations() {
                        tracing::warn!(subsystem = "archive", error = reason, "archive degraded");
                    }
                }
            }
        },
        |_error| {},
    );

    let ws_state_connections = Arc::new(AtomicUsize::new(0));
    let app = routes::app(store, ws_state_connections, &app_config.publishing);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    tracing::info!("Shutting down");
    scheduler.stop().await;
    served?;

    Ok(())
}
