use crate::{LocalStorage, Storage, StorageResult};
use memoria_core::Config;
use std::sync::Arc;

/// Create the storage backend described by configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(
        config.uploads.local_storage_path.clone(),
        config.uploads.local_storage_base_url.clone(),
    )
    .await?;

    tracing::info!(
        path = %config.uploads.local_storage_path,
        "Using local filesystem storage"
    );

    Ok(Arc::new(storage))
}
