//! Memoria Storage Library
//!
//! Binary storage for uploaded media behind the [`Storage`] trait, with a local
//! filesystem backend.
//!
//! # Storage key format
//!
//! Keys are owner-scoped: `media/{owner_id}/{random}.{ext}`. Keys must not
//! contain `..` or a leading `/`. Key generation is centralized in the `keys`
//! module.

pub mod factory;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::sanitize_original_name;
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
