use std::sync::Arc;

use galeria_server::{
    config::{AppConfig, ReconcileMode, StorageType},
    metadata::MetadataStore,
    routes::{AppState, create_router},
    service::GalleryService,
    storage::{InMemoryStorage, LocalFileStorage, Storage},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let storage: Arc<dyn Storage> = match config.storage_type {
        StorageType::Memory => Arc::new(InMemoryStorage::new()),
        StorageType::Local => Arc::new(LocalFileStorage::new(config.upload_folder.clone())?),
    };

    let store = if config.database_url.contains(":memory:") {
        MetadataStore::open_in_memory().await?
    } else {
        MetadataStore::connect(&config.database_url, config.database_max_connections).await?
    };

    let service = GalleryService::new(storage, store);

    if config.reconcile != ReconcileMode::Off {
        let report = service
            .reconcile(config.reconcile == ReconcileMode::Clean)
            .await?;
        tracing::info!(
            orphan_files = report.orphan_files.len(),
            orphan_records = report.orphan_records.len(),
            "startup reconciliation finished"
        );
    }

    let app = create_router(AppState {
        service,
        max_file_size_mb: config.max_file_size_mb,
    });

    let addr = config.socket_addr()?;
    tracing::info!("Server running on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
