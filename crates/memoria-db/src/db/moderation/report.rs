use memoria_core::{
    models::{Report, ReportView},
    AppError,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const REPORT_COLUMNS: &str =
    "id, item_id, reporter_account_id, reason, status, created_at, processed_at";

/// Repository for content reports
#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, tx, reason), fields(db.table = "reports", db.operation = "insert"))]
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
        reporter_account_id: Uuid,
        reason: &str,
    ) -> Result<Report, AppError> {
        let sql = format!(
            r#"
            INSERT INTO reports (item_id, reporter_account_id, reason)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );
        let report = sqlx::query_as::<Postgres, Report>(&sql)
            .bind(item_id)
            .bind(reporter_account_id)
            .bind(reason)
            .fetch_one(&mut **tx)
            .await?;

        Ok(report)
    }

    /// Lock the report row for the rest of the transaction
    #[tracing::instrument(skip(self, tx), fields(db.table = "reports", db.operation = "lock", db.record_id = %id))]
    pub async fn get_for_update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Report>, AppError> {
        let sql = format!(
            "SELECT {} FROM reports WHERE id = $1 FOR UPDATE",
            REPORT_COLUMNS
        );
        let report = sqlx::query_as::<Postgres, Report>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(report)
    }

    /// Move a `new` report to `processed`. Returns 0 if absent or already processed.
    #[tracing::instrument(skip(self, tx), fields(db.table = "reports", db.operation = "update", db.record_id = %id))]
    pub async fn mark_processed_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE reports SET status = 'processed', processed_at = NOW() \
             WHERE id = $1 AND status = 'new'",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Sub-collection that currently holds the reported item
    #[tracing::instrument(skip(self, tx), fields(db.table = "reports", db.operation = "select", db.record_id = %id))]
    pub async fn sub_collection_of_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        let sub_collection_id = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            SELECT i.sub_collection_id
            FROM reports r
            JOIN items i ON i.id = r.item_id
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(sub_collection_id)
    }

    /// All reports joined with the current state of the reported content, newest first
    #[tracing::instrument(skip(self), fields(db.table = "reports", db.operation = "select"))]
    pub async fn list_views(&self) -> Result<Vec<ReportView>, AppError> {
        let rows = sqlx::query_as::<Postgres, ReportView>(
            r#"
            SELECT r.id, r.reason, r.status, r.created_at, r.processed_at,
                   i.id AS item_id, i.url AS item_url, i.is_deleted AS item_deleted,
                   s.id AS sub_collection_id, s.name AS sub_collection_name,
                   s.is_deleted AS sub_collection_deleted,
                   c.id AS collection_id,
                   owner.id AS owner_account_id, owner.username AS owner_username,
                   r.reporter_account_id, reporter.nickname AS reporter_nickname
            FROM reports r
            JOIN items i ON i.id = r.item_id
            JOIN sub_collections s ON s.id = i.sub_collection_id
            JOIN collections c ON c.id = s.collection_id
            JOIN accounts owner ON owner.id = c.account_id
            LEFT JOIN accounts reporter ON reporter.id = r.reporter_account_id
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
