use memoria_core::{models::Collection, AppError};
use uuid::Uuid;

use super::hierarchy::{HierarchyKind, HierarchyRepository, NamedKind};

pub struct CollectionKind;

impl HierarchyKind for CollectionKind {
    type Row = Collection;

    const LABEL: &'static str = "collections";
    const TABLE: &'static str = "collections";
    const PARENT_TABLE: &'static str = "accounts";
    const PARENT_COLUMN: &'static str = "account_id";
    const PARENT_LIVE_FILTER: &'static str = "";
    const COLUMNS: &'static str =
        "id, account_id, name, is_deleted, deleted_at, created_at, updated_at";
    const LIST_ORDER: &'static str = "created_at ASC, id ASC";
}

impl NamedKind for CollectionKind {
    const INSERT_SQL: &'static str = r#"
        INSERT INTO collections (account_id, name)
        VALUES ($1, $2)
        RETURNING id, account_id, name, is_deleted, deleted_at, created_at, updated_at
    "#;
}

/// Repository for an account's collections
pub type CollectionRepository = HierarchyRepository<CollectionKind>;

impl HierarchyRepository<CollectionKind> {
    /// Live collections of an account
    pub async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<Collection>, AppError> {
        self.list_live(account_id).await
    }
}
