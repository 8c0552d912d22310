//! Background reconciliation of in-flight video tasks.
//!
//! Runs the task sweeper against Postgres so submitted videos complete,
//! fail or time out even when no client is polling.

use std::sync::Arc;
use std::time::Duration;

use storyreel_pipeline::{PgStore, TaskSweeper, TaskTracker, TrackerConfig};
use storyreel_providers::{ProviderConfig, Providers};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storyreel_worker=debug,storyreel_pipeline=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = storyreel_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    storyreel_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connection pool created");

    let provider_config = ProviderConfig::from_env().expect("Invalid AI provider configuration");
    let providers = Providers::from_config(&provider_config).expect("Failed to build AI providers");
    let tracker_config = TrackerConfig::from_env();
    tracing::info!(
        mode = ?provider_config.mode,
        interval_secs = tracker_config.policy.interval.as_secs(),
        max_attempts = ?tracker_config.policy.max_attempts,
        "Worker configured",
    );

    let store = Arc::new(PgStore::new(pool));
    let tracker = Arc::new(TaskTracker::new(
        store.clone(),
        providers.video,
        tracker_config.policy,
    ));
    let sweeper = TaskSweeper::new(store, tracker);

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::spawn(async move {
        sweeper.run(token).await;
    });

    shutdown_signal().await;
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(10), handle).await;
    tracing::info!("Worker stopped");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
