use memoria_core::{
    models::{SubCollection, SubCollectionSummary},
    AppError,
};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::hierarchy::{HierarchyKind, HierarchyRepository, NamedKind};

pub struct SubCollectionKind;

impl HierarchyKind for SubCollectionKind {
    type Row = SubCollection;

    const LABEL: &'static str = "sub_collections";
    const TABLE: &'static str = "sub_collections";
    const PARENT_TABLE: &'static str = "collections";
    const PARENT_COLUMN: &'static str = "collection_id";
    const PARENT_LIVE_FILTER: &'static str = " AND is_deleted = FALSE";
    const COLUMNS: &'static str = "id, collection_id, name, sort_order, thumbnail_item_id, \
         is_deleted, deleted_at, created_at, updated_at";
    const LIST_ORDER: &'static str = "sort_order ASC, id ASC";
}

impl NamedKind for SubCollectionKind {
    // New rows go to the end of the collection's display order.
    const INSERT_SQL: &'static str = r#"
        INSERT INTO sub_collections (collection_id, name, sort_order)
        VALUES (
            $1,
            $2,
            (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM sub_collections WHERE collection_id = $1)
        )
        RETURNING id, collection_id, name, sort_order, thumbnail_item_id,
                  is_deleted, deleted_at, created_at, updated_at
    "#;
}

/// Repository for sub-collections under a collection
pub type SubCollectionRepository = HierarchyRepository<SubCollectionKind>;

impl HierarchyRepository<SubCollectionKind> {
    /// Live sub-collections with their live thumbnail URL joined in
    #[tracing::instrument(skip(self), fields(db.table = "sub_collections", db.operation = "select"))]
    pub async fn list_summaries(
        &self,
        collection_id: Uuid,
    ) -> Result<Vec<SubCollectionSummary>, AppError> {
        let rows = sqlx::query_as::<Postgres, SubCollectionSummary>(
            r#"
            SELECT s.id, s.collection_id, s.name, s.sort_order,
                   t.id AS thumbnail_item_id, t.url AS thumbnail_url, s.created_at
            FROM sub_collections s
            LEFT JOIN items t ON t.id = s.thumbnail_item_id AND t.is_deleted = FALSE
            WHERE s.collection_id = $1 AND s.is_deleted = FALSE
            ORDER BY s.sort_order ASC, s.id ASC
            "#,
        )
        .bind(collection_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Point the sub-collection's thumbnail at a live item it owns.
    ///
    /// Returns 0 when the item is not live or belongs elsewhere.
    #[tracing::instrument(skip(self, tx), fields(db.table = "sub_collections", db.operation = "update", db.record_id = %id))]
    pub async fn set_thumbnail_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        item_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sub_collections s
            SET thumbnail_item_id = $2, updated_at = NOW()
            WHERE s.id = $1
              AND s.is_deleted = FALSE
              AND EXISTS (
                  SELECT 1 FROM items i
                  WHERE i.id = $2 AND i.sub_collection_id = s.id AND i.is_deleted = FALSE
              )
            "#,
        )
        .bind(id)
        .bind(item_id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Clear the thumbnail only if it currently points at `item_id`
    #[tracing::instrument(skip(self, tx), fields(db.table = "sub_collections", db.operation = "update", db.record_id = %id))]
    pub async fn clear_thumbnail_if_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        item_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE sub_collections SET thumbnail_item_id = NULL, updated_at = NOW() \
             WHERE id = $1 AND thumbnail_item_id = $2",
        )
        .bind(id)
        .bind(item_id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}
