use memoria_core::{models::Session, AppError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const SESSION_COLUMNS: &str =
    "id, account_id, created_at, last_seen_at, invalidated_at, invalidation_reason";

/// Repository for login sessions
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "sessions", db.operation = "insert"))]
    pub async fn create(&self, account_id: Uuid) -> Result<Session, AppError> {
        let sql = format!(
            "INSERT INTO sessions (account_id) VALUES ($1) RETURNING {}",
            SESSION_COLUMNS
        );
        let session = sqlx::query_as::<Postgres, Session>(&sql)
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(session)
    }

    #[tracing::instrument(skip(self), fields(db.table = "sessions", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Session>, AppError> {
        let sql = format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS);
        let session = sqlx::query_as::<Postgres, Session>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    #[tracing::instrument(skip(self), fields(db.table = "sessions", db.operation = "update", db.record_id = %id))]
    pub async fn touch(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sessions SET last_seen_at = NOW() WHERE id = $1 AND invalidated_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "sessions", db.operation = "update", db.record_id = %id))]
    pub async fn invalidate(&self, id: Uuid, reason: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET invalidated_at = NOW(), invalidation_reason = $2
            WHERE id = $1 AND invalidated_at IS NULL
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Invalidate every live session of an account
    #[tracing::instrument(skip(self), fields(db.table = "sessions", db.operation = "update"))]
    pub async fn invalidate_all_for_account(
        &self,
        account_id: Uuid,
        reason: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET invalidated_at = NOW(), invalidation_reason = $2
            WHERE account_id = $1 AND invalidated_at IS NULL
            "#,
        )
        .bind(account_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), fields(db.table = "sessions", db.operation = "count"))]
    pub async fn count_live(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM sessions WHERE invalidated_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
