//! Storage abstraction trait

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Location of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Internal identifier used to reference the object later
    pub key: String,
    /// Publicly reachable URL
    pub url: String,
    pub size: u64,
}

/// Binary storage consumed by the media services.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `data` for `owner_id` and return where it landed
    async fn store(
        &self,
        owner_id: Uuid,
        original_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<StoredObject>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Public URL for a stored key
    fn resolve_url(&self, storage_key: &str) -> StorageResult<String>;

    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;
}
