//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::Result;
use cadenza_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry()?;

    tracing::info!(
        environment = %config.environment(),
        storage_backend = %config.storage_backend(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let (storage, upload_signer) = storage::setup_storage(&config).await?;
    let state = services::initialize_services(&config, pool, storage, upload_signer);
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
