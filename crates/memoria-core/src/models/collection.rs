use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Top-level grouping owned by an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Collection {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Grouping nested under a collection, optionally carrying a thumbnail item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct SubCollection {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub name: String,
    pub sort_order: i32,
    pub thumbnail_item_id: Option<Uuid>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row for a sub-collection with its live thumbnail joined in.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct SubCollectionSummary {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub name: String,
    pub sort_order: i32,
    pub thumbnail_item_id: Option<Uuid>,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for creating or renaming a collection or sub-collection
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NameRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,
}

impl NameRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
        }
    }
}
