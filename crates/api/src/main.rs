use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cane_core::persistence::{MemoryRepository, TelemetryRepository};
use cane_core::service::TelemetryService;
use cane_db::{JsonFileRepository, PgTelemetryRepository};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cane_api::background;
use cane_api::config::{ServerConfig, StorageConfig};
use cane_api::router::build_app_router;
use cane_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cane_api=debug,cane_core=debug,cane_db=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        storage = config.storage.name(),
        "Loaded server configuration"
    );

    // --- Storage ---
    let repository = build_repository(&config.storage).await;

    // --- Telemetry service ---
    let service = Arc::new(TelemetryService::load(repository, config.service_options()).await);

    // Spawn autosave (periodic flush to durable storage).
    let autosave_cancel = CancellationToken::new();
    let autosave_handle = tokio::spawn(background::autosave::run(
        Arc::clone(&service),
        Duration::from_secs(config.autosave_interval_secs),
        autosave_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        service: Arc::clone(&service),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    autosave_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), autosave_handle).await;
    tracing::info!("Autosave job stopped");

    // Final checkpoint so readings since the last flush are not lost.
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(shutdown_timeout, service.flush_if_dirty()).await {
        Ok(Ok(Some(entries))) => tracing::info!(entries, "Final flush complete"),
        Ok(Ok(None)) => tracing::info!("Final flush skipped, nothing changed"),
        Ok(Err(e)) => tracing::error!(error = %e, "Final flush failed"),
        Err(_) => tracing::error!(
            timeout_secs = config.shutdown_timeout_secs,
            "Final flush timed out"
        ),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Construct the durable storage backend selected by `STORAGE_BACKEND`.
///
/// Postgres connectivity and migrations are checked here so a bad
/// `DATABASE_URL` fails the process at startup.
async fn build_repository(storage: &StorageConfig) -> Arc<dyn TelemetryRepository> {
    match storage {
        StorageConfig::File {
            data_file,
            settings_file,
        } => {
            tracing::info!(
                data_file = %data_file.display(),
                settings_file = %settings_file.display(),
                "Using JSON file storage"
            );
            Arc::new(JsonFileRepository::new(data_file, settings_file))
        }
        StorageConfig::Postgres { database_url } => {
            let pool = cane_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            cane_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            cane_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgTelemetryRepository::new(pool))
        }
        StorageConfig::Memory => {
            tracing::warn!("Using in-memory storage, telemetry will not survive a restart");
            Arc::new(MemoryRepository::new())
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
