//! Memoria Core Library
//!
//! Domain models, error types, configuration and validation shared by every
//! Memoria crate.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, GeocodingConfig, LogFormat, QuotaConfig, UploadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
