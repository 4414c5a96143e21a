//! Upload admission and storage hand-off

use memoria_core::{
    models::{MediaKind, StoredPayload},
    AppError, UploadConfig,
};
use memoria_storage::{sanitize_original_name, Storage, StorageError};
use std::sync::Arc;
use uuid::Uuid;

/// Validates uploads against the configured limits and writes them to storage.
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn Storage>,
    config: UploadConfig,
}

impl UploadService {
    pub fn new(storage: Arc<dyn Storage>, config: UploadConfig) -> Self {
        Self { storage, config }
    }

    /// Check the MIME type and size of an upload before any bytes are written.
    pub fn admit(&self, mime_type: &str, size_bytes: u64) -> Result<MediaKind, AppError> {
        let kind = MediaKind::from_mime(mime_type).ok_or_else(|| {
            AppError::InvalidInput(format!("Unsupported file type: {}", mime_type))
        })?;

        if size_bytes == 0 {
            return Err(AppError::InvalidInput("File is empty".to_string()));
        }

        let limit = match kind {
            MediaKind::Image => self.config.max_image_size_bytes,
            MediaKind::Video => self.config.max_video_size_bytes,
        };
        if size_bytes > limit {
            return Err(AppError::InvalidInput(format!(
                "File exceeds the maximum size of {} bytes",
                limit
            )));
        }

        Ok(kind)
    }

    #[tracing::instrument(skip(self, data), fields(owner_id = %owner_id, size_bytes = data.len()))]
    pub async fn store(
        &self,
        owner_id: Uuid,
        original_name: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<StoredPayload, AppError> {
        let kind = self.admit(mime_type, data.len() as u64)?;
        let original_name = sanitize_original_name(original_name);

        let stored = self
            .storage
            .store(owner_id, &original_name, mime_type, data)
            .await
            .map_err(storage_error)?;

        Ok(StoredPayload {
            storage_key: stored.key,
            url: stored.url,
            original_name,
            mime_type: mime_type.trim().to_ascii_lowercase(),
            size_bytes: stored.size as i64,
            kind,
        })
    }

    /// Best-effort removal of an object that no row references.
    pub async fn discard(&self, storage_key: &str) {
        if let Err(e) = self.storage.delete(storage_key).await {
            tracing::warn!(key = %storage_key, error = %e, "Failed to delete orphaned object");
        }
    }
}

fn storage_error(err: StorageError) -> AppError {
    match err {
        StorageError::InvalidKey(message) => AppError::InvalidInput(message),
        other => AppError::Dependency {
            service: "storage".to_string(),
            message: other.to_string(),
        },
    }
}
