pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod voting;

use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use admin::AdminGate;
use config::{Config, StorageBackend};
use db::{JsonFileStore, Records, SqliteStore};
use error::PollError;
use handlers::AppState;
use handlers::session::SessionStore;
use voting::VotingService;

// Opens the configured store, creates missing records and wires the services.
pub async fn build_state(config: Config) -> Result<Arc<AppState>, PollError> {
    let records = match &config.storage {
        StorageBackend::Json { data_dir } => {
            info!("Using JSON records in {}", data_dir.display());
            Records::new(JsonFileStore::new(data_dir))
        }
        StorageBackend::Sqlite { database_url } => {
            info!("Using SQLite records at {}", database_url);
            Records::new(SqliteStore::connect(database_url).await?)
        }
    };

    let config = Arc::new(config);
    let voting = VotingService::new(Arc::clone(&config), records);
    voting.initialize().await?;

    Ok(Arc::new(AppState {
        voting,
        admin: AdminGate::new(config),
        sessions: SessionStore::new(),
    }))
}

pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let address = config.bind_address.clone();

    info!("Initializing state...");
    let state = build_state(config).await?;
    let app = handlers::router(state);

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
