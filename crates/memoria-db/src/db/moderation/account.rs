use chrono::{DateTime, Utc};
use memoria_core::{
    models::{Account, AccountOverview, AccountRole, AccountStatus},
    AppError,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, username, email, nickname, password_hash, role, status, \
     status_reason, penalty_end_at, created_at, updated_at";

/// Repository for accounts and their moderation state
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, password_hash), fields(db.table = "accounts", db.operation = "insert"))]
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        nickname: &str,
        password_hash: &str,
        role: AccountRole,
    ) -> Result<Account, AppError> {
        let sql = format!(
            r#"
            INSERT INTO accounts (username, email, nickname, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<Postgres, Account>(&sql)
            .bind(username)
            .bind(email)
            .bind(nickname)
            .bind(password_hash)
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        Ok(account)
    }

    #[tracing::instrument(skip(self), fields(db.table = "accounts", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<Postgres, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    #[tracing::instrument(skip(self), fields(db.table = "accounts", db.operation = "select"))]
    pub async fn get_by_username(&self, username: &str) -> Result<Option<Account>, AppError> {
        let sql = format!("SELECT {} FROM accounts WHERE username = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<Postgres, Account>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Lock the account row for the rest of the transaction
    #[tracing::instrument(skip(self, tx), fields(db.table = "accounts", db.operation = "lock", db.record_id = %id))]
    pub async fn get_for_update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Account>, AppError> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE id = $1 FOR UPDATE",
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<Postgres, Account>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(account)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "accounts", db.operation = "update", db.record_id = %id))]
    pub async fn set_status_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: AccountStatus,
        reason: Option<&str>,
        penalty_end_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Account>, AppError> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET status = $2, status_reason = $3, penalty_end_at = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<Postgres, Account>(&sql)
            .bind(id)
            .bind(status)
            .bind(reason)
            .bind(penalty_end_at)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(account)
    }

    #[tracing::instrument(skip(self), fields(db.table = "accounts", db.operation = "update", db.record_id = %id))]
    pub async fn update_profile(
        &self,
        id: Uuid,
        nickname: &str,
        email: &str,
    ) -> Result<Option<Account>, AppError> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET nickname = $2, email = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<Postgres, Account>(&sql)
            .bind(id)
            .bind(nickname)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    #[tracing::instrument(skip(self, password_hash), fields(db.table = "accounts", db.operation = "update", db.record_id = %id))]
    pub async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Reinstate the account if its suspension has run out. Returns the updated row when lifted.
    #[tracing::instrument(skip(self), fields(db.table = "accounts", db.operation = "update", db.record_id = %id))]
    pub async fn lift_expired_suspension(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET status = 'active', status_reason = NULL, penalty_end_at = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'suspended' AND penalty_end_at <= NOW()
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<Postgres, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Hard-delete an account; owned content and sessions cascade
    #[tracing::instrument(skip(self), fields(db.table = "accounts", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Owner `(account id, username)` of a collection, deleted or not
    #[tracing::instrument(skip(self), fields(db.table = "accounts", db.operation = "select"))]
    pub async fn owner_of_collection(
        &self,
        collection_id: Uuid,
    ) -> Result<Option<(Uuid, String)>, AppError> {
        let owner = sqlx::query_as::<Postgres, (Uuid, String)>(
            r#"
            SELECT a.id, a.username
            FROM collections c
            JOIN accounts a ON a.id = c.account_id
            WHERE c.id = $1
            "#,
        )
        .bind(collection_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner)
    }

    /// Live sub-collections across the account's collections
    #[tracing::instrument(skip(self), fields(db.table = "sub_collections", db.operation = "count", db.record_id = %id))]
    pub async fn post_count(&self, id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            r#"
            SELECT COUNT(*)
            FROM sub_collections s
            JOIN collections c ON c.id = s.collection_id
            WHERE c.account_id = $1 AND s.is_deleted = FALSE
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Every report filed against the account's items.
    ///
    /// No deletion or status filter: resolving a report or removing the
    /// reported content never lowers this number.
    #[tracing::instrument(skip(self), fields(db.table = "reports", db.operation = "count", db.record_id = %id))]
    pub async fn report_count(&self, id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            r#"
            SELECT COUNT(*)
            FROM reports r
            JOIN items i ON i.id = r.item_id
            JOIN sub_collections s ON s.id = i.sub_collection_id
            JOIN collections c ON c.id = s.collection_id
            WHERE c.account_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "accounts", db.operation = "select"))]
    pub async fn list_overview(&self) -> Result<Vec<AccountOverview>, AppError> {
        let rows = sqlx::query_as::<Postgres, AccountOverview>(
            r#"
            SELECT a.id, a.username, a.nickname, a.email, a.role, a.status, a.status_reason,
                   a.penalty_end_at, a.created_at,
                   (SELECT COUNT(*)
                      FROM sub_collections s
                      JOIN collections c ON c.id = s.collection_id
                     WHERE c.account_id = a.id AND s.is_deleted = FALSE) AS post_count,
                   (SELECT COUNT(*)
                      FROM reports r
                      JOIN items i ON i.id = r.item_id
                      JOIN sub_collections s ON s.id = i.sub_collection_id
                      JOIN collections c ON c.id = s.collection_id
                     WHERE c.account_id = a.id) AS report_count,
                   (SELECT MAX(se.created_at)
                      FROM sessions se
                     WHERE se.account_id = a.id) AS last_login_at
            FROM accounts a
            ORDER BY a.created_at DESC, a.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "accounts", db.operation = "count"))]
    pub async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Bytes held by items of live sub-collections
    #[tracing::instrument(skip(self), fields(db.table = "items", db.operation = "sum"))]
    pub async fn used_bytes(&self) -> Result<i64, AppError> {
        let used = sqlx::query_scalar::<Postgres, i64>(
            r#"
            SELECT COALESCE(SUM(i.size_bytes), 0)::BIGINT
            FROM items i
            JOIN sub_collections s ON s.id = i.sub_collection_id
            WHERE s.is_deleted = FALSE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(used)
    }
}
