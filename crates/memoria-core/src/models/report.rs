use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Report lifecycle; `Processed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "report_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    New,
    Processed,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Report {
    pub id: Uuid,
    pub item_id: Uuid,
    pub reporter_account_id: Option<Uuid>,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Report joined with the current state of the content it points at.
///
/// Nothing here is snapshotted at report time: renaming or deleting the
/// sub-collection changes what a listing shows.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct ReportView {
    pub id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub item_id: Uuid,
    pub item_url: String,
    pub item_deleted: bool,
    pub sub_collection_id: Uuid,
    pub sub_collection_name: String,
    pub sub_collection_deleted: bool,
    pub collection_id: Uuid,
    pub owner_account_id: Uuid,
    pub owner_username: String,
    pub reporter_account_id: Option<Uuid>,
    pub reporter_nickname: Option<String>,
}

/// Request DTO for reporting an item
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReportRequest {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Reason must be between 1 and 500 characters"
    ))]
    pub reason: String,
}
