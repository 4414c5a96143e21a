use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::{AccountRole, AccountStatus, Item, SubCollection};

/// Per-account row in the moderation overview.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct AccountOverview {
    pub id: Uuid,
    pub username: String,
    pub nickname: String,
    pub email: String,
    pub role: AccountRole,
    pub status: AccountStatus,
    pub status_reason: Option<String>,
    pub penalty_end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Live sub-collections across all of the account's collections.
    pub post_count: i64,
    /// Every report ever filed against the account's items.
    pub report_count: i64,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Dashboard numbers.
#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_accounts: i64,
    pub used_bytes: i64,
    pub capacity_bytes: i64,
    pub live_sessions: i64,
}

/// A sub-collection with every item it ever held, deleted ones included.
#[derive(Debug, Clone, Serialize)]
pub struct SubCollectionDetail {
    pub sub_collection: SubCollection,
    pub owner_account_id: Uuid,
    pub owner_username: String,
    pub items: Vec<Item>,
}
