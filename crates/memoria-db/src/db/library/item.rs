use memoria_core::{
    models::{Item, MapLocation, ResolvedLocation, StoredPayload},
    AppError,
};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::hierarchy::{HierarchyKind, HierarchyRepository};

const ITEM_COLUMNS: &str = "id, sub_collection_id, kind, storage_key, url, original_name, mime_type, \
     size_bytes, description, location_name, latitude, longitude, is_deleted, deleted_at, \
     created_at, updated_at";

pub struct ItemKind;

impl HierarchyKind for ItemKind {
    type Row = Item;

    const LABEL: &'static str = "items";
    const TABLE: &'static str = "items";
    const PARENT_TABLE: &'static str = "sub_collections";
    const PARENT_COLUMN: &'static str = "sub_collection_id";
    const PARENT_LIVE_FILTER: &'static str = " AND is_deleted = FALSE";
    const COLUMNS: &'static str = ITEM_COLUMNS;
    const LIST_ORDER: &'static str = "created_at ASC, id ASC";
}

/// Repository for media items
pub type ItemRepository = HierarchyRepository<ItemKind>;

impl HierarchyRepository<ItemKind> {
    #[tracing::instrument(skip(self, tx, payload, location), fields(db.table = "items", db.operation = "insert"))]
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        sub_collection_id: Uuid,
        payload: &StoredPayload,
        description: Option<&str>,
        location: &ResolvedLocation,
    ) -> Result<Item, AppError> {
        let sql = format!(
            r#"
            INSERT INTO items (sub_collection_id, kind, storage_key, url, original_name, mime_type,
                               size_bytes, description, location_name, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );
        let item = sqlx::query_as::<Postgres, Item>(&sql)
            .bind(sub_collection_id)
            .bind(payload.kind)
            .bind(&payload.storage_key)
            .bind(&payload.url)
            .bind(&payload.original_name)
            .bind(&payload.mime_type)
            .bind(payload.size_bytes)
            .bind(description)
            .bind(location.name.as_deref())
            .bind(location.coordinates.map(|c| c.latitude))
            .bind(location.coordinates.map(|c| c.longitude))
            .fetch_one(&mut **tx)
            .await?;

        Ok(item)
    }

    /// Overwrite description and location of a live item
    #[tracing::instrument(skip(self, tx, location), fields(db.table = "items", db.operation = "update", db.record_id = %id))]
    pub async fn update_meta_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        description: Option<&str>,
        location: &ResolvedLocation,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET description = $2, location_name = $3, latitude = $4, longitude = $5, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(description)
        .bind(location.name.as_deref())
        .bind(location.coordinates.map(|c| c.latitude))
        .bind(location.coordinates.map(|c| c.longitude))
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "items", db.operation = "update", db.record_id = %id))]
    pub async fn update_coordinates_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE items SET latitude = $2, longitude = $3, updated_at = NOW() \
             WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .bind(latitude)
        .bind(longitude)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Swap the stored file behind a live item, keeping its id and metadata
    #[tracing::instrument(skip(self, tx, payload), fields(db.table = "items", db.operation = "update", db.record_id = %id))]
    pub async fn replace_file_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        payload: &StoredPayload,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET kind = $2, storage_key = $3, url = $4, original_name = $5, mime_type = $6,
                size_bytes = $7, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(payload.kind)
        .bind(&payload.storage_key)
        .bind(&payload.url)
        .bind(&payload.original_name)
        .bind(&payload.mime_type)
        .bind(payload.size_bytes)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Live items of a sub-collection, excluding the one used as its thumbnail
    #[tracing::instrument(skip(self), fields(db.table = "items", db.operation = "select"))]
    pub async fn list_gallery(&self, sub_collection_id: Uuid) -> Result<Vec<Item>, AppError> {
        let rows = sqlx::query_as::<Postgres, Item>(
            r#"
            SELECT i.id, i.sub_collection_id, i.kind, i.storage_key, i.url, i.original_name,
                   i.mime_type, i.size_bytes, i.description, i.location_name, i.latitude,
                   i.longitude, i.is_deleted, i.deleted_at, i.created_at, i.updated_at
            FROM items i
            JOIN sub_collections s ON s.id = i.sub_collection_id
            WHERE i.sub_collection_id = $1
              AND i.is_deleted = FALSE
              AND (s.thumbnail_item_id IS NULL OR s.thumbnail_item_id <> i.id)
            ORDER BY i.created_at ASC, i.id ASC
            "#,
        )
        .bind(sub_collection_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Every item a sub-collection ever held, deleted ones included
    #[tracing::instrument(skip(self), fields(db.table = "items", db.operation = "select"))]
    pub async fn list_all(&self, sub_collection_id: Uuid) -> Result<Vec<Item>, AppError> {
        let sql = format!(
            "SELECT {} FROM items WHERE sub_collection_id = $1 ORDER BY created_at ASC, id ASC",
            ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<Postgres, Item>(&sql)
            .bind(sub_collection_id)
            .fetch_all(self.pool())
            .await?;

        Ok(rows)
    }

    /// Geotagged live items across an account's live hierarchy
    #[tracing::instrument(skip(self), fields(db.table = "items", db.operation = "select"))]
    pub async fn list_map_locations(&self, account_id: Uuid) -> Result<Vec<MapLocation>, AppError> {
        let rows = sqlx::query_as::<Postgres, MapLocation>(
            r#"
            SELECT i.id AS item_id, i.sub_collection_id, s.collection_id, i.kind, i.url,
                   i.location_name, i.latitude, i.longitude
            FROM items i
            JOIN sub_collections s ON s.id = i.sub_collection_id
            JOIN collections c ON c.id = s.collection_id
            WHERE c.account_id = $1
              AND c.is_deleted = FALSE
              AND s.is_deleted = FALSE
              AND i.is_deleted = FALSE
              AND i.latitude IS NOT NULL
              AND i.longitude IS NOT NULL
            ORDER BY i.created_at DESC, i.id DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Storage keys of every item in an account's hierarchy, deleted ones included
    #[tracing::instrument(skip(self), fields(db.table = "items", db.operation = "select"))]
    pub async fn storage_keys_for_account(&self, account_id: Uuid) -> Result<Vec<String>, AppError> {
        let keys = sqlx::query_scalar::<Postgres, String>(
            r#"
            SELECT i.storage_key
            FROM items i
            JOIN sub_collections s ON s.id = i.sub_collection_id
            JOIN collections c ON c.id = s.collection_id
            WHERE c.account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_all(self.pool())
        .await?;

        Ok(keys)
    }
}
