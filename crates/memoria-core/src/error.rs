//! Error types module
//!
//! All failures surfaced by the library are unified under [`AppError`]. The variants
//! mirror the caller-facing taxonomy (validation, authorization, not found, quota,
//! conflict, blocked account, dependency) plus a handful of internal variants that
//! never cross the service boundary unclassified.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.
//! Repository code converts with `?` into `Database`; the unit of work and the service
//! read paths then call [`AppError::classify`] so no raw SQL error reaches a caller.

use chrono::{DateTime, Utc};
use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::models::AccountStatus;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like quota limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code a transport layer should return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "QUOTA_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Quota exceeded: {resource} usage {used}/{limit}")]
    QuotaExceeded {
        resource: String,
        used: i64,
        limit: i64,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Account {status}: {reason}")]
    AccountBlocked {
        status: AccountStatus,
        reason: String,
        penalty_end_at: Option<DateTime<Utc>>,
    },

    #[error("Dependency {service} failed: {message}")]
    Dependency { service: String, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

// Postgres SQLSTATE codes that carry caller-relevant meaning.
#[cfg(feature = "sqlx")]
const PG_SERIALIZATION_FAILURE: &str = "40001";
#[cfg(feature = "sqlx")]
const PG_DEADLOCK_DETECTED: &str = "40P01";

impl AppError {
    /// Map a raw SQL failure into the caller-facing taxonomy.
    ///
    /// Every other variant passes through untouched, so this is safe to apply to
    /// any `Result` leaving a transaction.
    pub fn classify(self) -> Self {
        match self {
            #[cfg(feature = "sqlx")]
            AppError::Database(err) => Self::from_db(err),
            other => other,
        }
    }

    #[cfg(feature = "sqlx")]
    pub fn from_db(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => AppError::NotFound("Row not found".to_string()),
            SqlxError::Database(db) => {
                let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
                if db.is_unique_violation() {
                    AppError::Conflict(format!(
                        "Duplicate value violates {}",
                        db.constraint().unwrap_or("a unique constraint")
                    ))
                } else if db.is_check_violation() {
                    AppError::InvalidInput(format!(
                        "Value violates {}",
                        db.constraint().unwrap_or("a check constraint")
                    ))
                } else if code == PG_SERIALIZATION_FAILURE || code == PG_DEADLOCK_DETECTED {
                    AppError::Conflict("Concurrent modification, retry the operation".to_string())
                } else {
                    AppError::Dependency {
                        service: "database".to_string(),
                        message: err.to_string(),
                    }
                }
            }
            _ => AppError::Dependency {
                service: "database".to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            true,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "FORBIDDEN",
            false,
            Some("Verify you own the requested resource"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::QuotaExceeded { .. } => (
            409,
            "QUOTA_EXCEEDED",
            false,
            Some("Delete an existing entry before creating a new one"),
            false,
            LogLevel::Warn,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            true,
            Some("Reload the resource and retry"),
            false,
            LogLevel::Warn,
        ),
        AppError::AccountBlocked { .. } => (
            403,
            "ACCOUNT_BLOCKED",
            false,
            Some("Contact an administrator"),
            false,
            LogLevel::Debug,
        ),
        AppError::Dependency { .. } => (
            503,
            "DEPENDENCY_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Log in again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Forbidden(_) => "You do not have access to this resource".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::QuotaExceeded {
                resource,
                used,
                limit,
            } => format!("Limit reached for {}: {}/{}", resource, used, limit),
            AppError::Conflict(msg) => msg.clone(),
            AppError::AccountBlocked { status, .. } => match status {
                AccountStatus::Banned => "This account has been permanently banned.".to_string(),
                _ => "This account has been suspended.".to_string(),
            },
            AppError::Dependency { service, .. } => {
                format!("The {} service is unavailable", service)
            }
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to access database");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_quota_exceeded() {
        let err = AppError::QuotaExceeded {
            resource: "collections".to_string(),
            used: 12,
            limit: 12,
        };
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "QUOTA_EXCEEDED");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("collections"));
        assert!(err.client_message().contains("12/12"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_account_blocked() {
        let suspended = AppError::AccountBlocked {
            status: AccountStatus::Suspended,
            reason: "Policy violation.".to_string(),
            penalty_end_at: Some(Utc::now()),
        };
        assert_eq!(suspended.http_status_code(), 403);
        assert_eq!(suspended.error_code(), "ACCOUNT_BLOCKED");
        assert_eq!(
            suspended.client_message(),
            "This account has been suspended."
        );

        let banned = AppError::AccountBlocked {
            status: AccountStatus::Banned,
            reason: "Spam".to_string(),
            penalty_end_at: None,
        };
        assert_eq!(
            banned.client_message(),
            "This account has been permanently banned."
        );
    }

    #[test]
    fn test_forbidden_hides_details() {
        let err = AppError::Forbidden("sub-collection 42 owned by someone else".to_string());
        assert_eq!(err.http_status_code(), 403);
        assert!(!err.client_message().contains("42"));
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_classify_row_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound).classify();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_classify_pool_failure_is_dependency() {
        let err = AppError::from(sqlx::Error::PoolTimedOut).classify();
        match err {
            AppError::Dependency { service, .. } => assert_eq!(service, "database"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_passes_domain_errors_through() {
        let err = AppError::Conflict("thumbnail target deleted".to_string()).classify();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
