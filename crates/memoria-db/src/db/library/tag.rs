use memoria_core::{models::Tag, AppError};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for tags and item-tag links
#[derive(Clone)]
pub struct TagRepository {
    pool: PgPool,
}

impl TagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Return the tag named `name`, creating it if it does not exist yet.
    ///
    /// The no-op update makes `RETURNING` yield the existing row on conflict, so
    /// concurrent creators of the same name both get the one row.
    #[tracing::instrument(skip(self, tx), fields(db.table = "tags", db.operation = "upsert"))]
    pub async fn find_or_create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
    ) -> Result<Tag, AppError> {
        let tag = sqlx::query_as::<Postgres, Tag>(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;

        Ok(tag)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "item_tags", db.operation = "delete", db.record_id = %item_id))]
    pub async fn unlink_all_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM item_tags WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "item_tags", db.operation = "insert"))]
    pub async fn link_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
        tag_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO item_tags (item_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(item_id)
        .bind(tag_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Tag names linked to an item, alphabetical
    #[tracing::instrument(skip(self), fields(db.table = "item_tags", db.operation = "select", db.record_id = %item_id))]
    pub async fn names_for_item(&self, item_id: Uuid) -> Result<Vec<String>, AppError> {
        let names = sqlx::query_scalar::<Postgres, String>(
            r#"
            SELECT t.name
            FROM item_tags it
            JOIN tags t ON t.id = it.tag_id
            WHERE it.item_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }

    /// `(item_id, tag name)` pairs for a batch of items
    #[tracing::instrument(skip(self, item_ids), fields(db.table = "item_tags", db.operation = "select", db.batch_size = item_ids.len()))]
    pub async fn names_for_items(&self, item_ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, AppError> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let pairs = sqlx::query_as::<Postgres, (Uuid, String)>(
            r#"
            SELECT it.item_id, t.name
            FROM item_tags it
            JOIN tags t ON t.id = it.tag_id
            WHERE it.item_id = ANY($1)
            ORDER BY it.item_id, t.name ASC
            "#,
        )
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(pairs)
    }
}
