use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use domain::services::{spawn_notification_worker, RecordStore};
use event_manager_api::{
    app::{create_app, AppState},
    config::{Config, StorageBackend},
    middleware,
    services::{EmailNotificationDispatcher, EmailService},
};
use persistence::{InMemoryRecordStore, PgRecordStore};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    middleware::logging::init_logging(&config.logging)
        .context("Failed to initialize logging")?;
    middleware::init_metrics().context("Failed to initialize metrics")?;

    info!("Starting Event Manager API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn RecordStore> = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = persistence::db::create_pool(&(&config.database).into())
                .await
                .context("Failed to connect to database")?;

            info!("Running database migrations...");
            persistence::db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            info!("Migrations completed");

            Arc::new(PgRecordStore::new(pool))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory record store; data is lost on restart");
            Arc::new(InMemoryRecordStore::new())
        }
    };

    let addr = config.socket_addr()?;
    let email = EmailService::new(config.email.clone());
    let store_timeout = Duration::from_millis(config.rsvp.store_timeout_ms);

    let (state, notifications) = AppState::new(config, Arc::clone(&store));
    let dispatcher = EmailNotificationDispatcher::new(email, store, store_timeout);
    let worker = spawn_notification_worker(notifications, Arc::new(dispatcher));

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router held the last queue sender; the worker drains what is left.
    if let Err(e) = worker.await {
        warn!(error = %e, "Notification worker ended abnormally");
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
