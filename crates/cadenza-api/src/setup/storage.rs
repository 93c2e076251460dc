//! Storage setup and initialization

use anyhow::Result;
use cadenza_core::{Config, StorageBackend};
use cadenza_storage::{create_local_storage, create_storage, Storage, UploadSigner};
use std::sync::Arc;

/// Build the configured backend; the local backend also yields the signer that
/// the storage route verifies writes with
pub async fn setup_storage(config: &Config) -> Result<(Arc<dyn Storage>, Option<UploadSigner>)> {
    tracing::info!("Initializing storage...");

    let (storage, signer): (Arc<dyn Storage>, Option<UploadSigner>) =
        match config.storage_backend() {
            StorageBackend::Local => {
                let local = create_local_storage(config).await?;
                let signer = local.signer().clone();
                (Arc::new(local), Some(signer))
            }
            StorageBackend::S3 => (create_storage(config).await?, None),
        };

    tracing::info!(
        backend = ?storage.backend_type(),
        direct_writes = signer.is_some(),
        "Storage initialized successfully"
    );

    Ok((storage, signer))
}
