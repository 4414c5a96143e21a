//! Generic repository over the content hierarchy
//!
//! Collections, sub-collections and items share the same shape: a row owned by
//! a parent row, soft-deleted with a flag and timestamp, listed and counted over
//! live rows only. [`HierarchyRepository`] implements those operations once,
//! parameterized by a [`HierarchyKind`]. Kind-specific queries live in inherent
//! impls next to each kind.
//!
//! Quota enforcement locks the parent row (`FOR UPDATE`) before counting, so two
//! concurrent inserts under the same parent serialize on that lock and the second
//! one counts the first one's committed row.

use memoria_core::AppError;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::marker::PhantomData;
use uuid::Uuid;

/// Describes one level of the hierarchy.
pub trait HierarchyKind: Send + Sync + 'static {
    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin;

    /// Plural label used in errors and logs (e.g. "collections")
    const LABEL: &'static str;
    const TABLE: &'static str;
    const PARENT_TABLE: &'static str;
    const PARENT_COLUMN: &'static str;
    /// Extra predicate a parent must satisfy to accept children
    const PARENT_LIVE_FILTER: &'static str;
    const COLUMNS: &'static str;
    const LIST_ORDER: &'static str;
}

/// Kinds whose rows carry a user-chosen name.
pub trait NamedKind: HierarchyKind {
    /// Insert statement binding `$1` = parent id and `$2` = name, returning `COLUMNS`
    const INSERT_SQL: &'static str;
}

pub struct HierarchyRepository<K: HierarchyKind> {
    pool: PgPool,
    quota: Option<i64>,
    _kind: PhantomData<K>,
}

impl<K: HierarchyKind> Clone for HierarchyRepository<K> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            quota: self.quota,
            _kind: PhantomData,
        }
    }
}

impl<K: HierarchyKind> HierarchyRepository<K> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            quota: None,
            _kind: PhantomData,
        }
    }

    /// Repository that refuses inserts once `limit` live rows exist under a parent
    pub fn with_quota(pool: PgPool, limit: i64) -> Self {
        Self {
            pool,
            quota: Some(limit),
            _kind: PhantomData,
        }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[tracing::instrument(skip(self), fields(db.table = K::TABLE, db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<K::Row>, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", K::COLUMNS, K::TABLE);
        let row = sqlx::query_as::<Postgres, K::Row>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = K::TABLE, db.operation = "select", db.record_id = %id))]
    pub async fn get_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<K::Row>, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", K::COLUMNS, K::TABLE);
        let row = sqlx::query_as::<Postgres, K::Row>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(row)
    }

    /// Live rows under `parent_id`, in display order
    #[tracing::instrument(skip(self), fields(db.table = K::TABLE, db.operation = "select"))]
    pub async fn list_live(&self, parent_id: Uuid) -> Result<Vec<K::Row>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1 AND is_deleted = FALSE ORDER BY {}",
            K::COLUMNS,
            K::TABLE,
            K::PARENT_COLUMN,
            K::LIST_ORDER
        );
        let rows = sqlx::query_as::<Postgres, K::Row>(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = K::TABLE, db.operation = "count"))]
    pub async fn count_live_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        parent_id: Uuid,
    ) -> Result<i64, AppError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1 AND is_deleted = FALSE",
            K::TABLE,
            K::PARENT_COLUMN
        );
        let count = sqlx::query_scalar::<Postgres, i64>(&sql)
            .bind(parent_id)
            .fetch_one(&mut **tx)
            .await?;

        Ok(count)
    }

    /// Take a row lock on the parent. Returns false if the parent is missing or not live.
    #[tracing::instrument(skip(self, tx), fields(db.table = K::PARENT_TABLE, db.operation = "lock"))]
    pub async fn lock_parent_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        parent_id: Uuid,
    ) -> Result<bool, AppError> {
        let sql = format!(
            "SELECT id FROM {} WHERE id = $1{} FOR UPDATE",
            K::PARENT_TABLE,
            K::PARENT_LIVE_FILTER
        );
        let locked = sqlx::query_scalar::<Postgres, Uuid>(&sql)
            .bind(parent_id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(locked.is_some())
    }

    /// Lock the parent and fail with `QuotaExceeded` when it is full.
    ///
    /// The lock is held until the surrounding transaction ends, so the caller's
    /// insert is covered by the same check.
    pub async fn ensure_capacity_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        parent_id: Uuid,
    ) -> Result<(), AppError> {
        if !self.lock_parent_tx(tx, parent_id).await? {
            return Err(AppError::NotFound(format!(
                "Parent of {} not found",
                K::LABEL
            )));
        }

        if let Some(limit) = self.quota {
            let used = self.count_live_tx(tx, parent_id).await?;
            if used >= limit {
                tracing::warn!(
                    resource = K::LABEL,
                    parent_id = %parent_id,
                    used,
                    limit,
                    "Quota reached"
                );
                return Err(AppError::QuotaExceeded {
                    resource: K::LABEL.to_string(),
                    used,
                    limit,
                });
            }
        }

        Ok(())
    }

    /// Mark a live row deleted. Returns the number of rows affected (0 if already deleted or absent).
    #[tracing::instrument(skip(self, tx), fields(db.table = K::TABLE, db.operation = "soft_delete", db.record_id = %id))]
    pub async fn soft_delete_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<u64, AppError> {
        let sql = format!(
            "UPDATE {} SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND is_deleted = FALSE",
            K::TABLE
        );
        let result = sqlx::query(&sql).bind(id).execute(&mut **tx).await?;

        Ok(result.rows_affected())
    }

    /// Mark every live row under `parent_id` deleted.
    #[tracing::instrument(skip(self, tx), fields(db.table = K::TABLE, db.operation = "soft_delete"))]
    pub async fn soft_delete_children_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        parent_id: Uuid,
    ) -> Result<u64, AppError> {
        let sql = format!(
            "UPDATE {} SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW() \
             WHERE {} = $1 AND is_deleted = FALSE",
            K::TABLE,
            K::PARENT_COLUMN
        );
        let result = sqlx::query(&sql)
            .bind(parent_id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }
}

impl<K: NamedKind> HierarchyRepository<K> {
    /// Insert a named row under `parent_id`, enforcing the configured quota.
    #[tracing::instrument(skip(self, tx), fields(db.table = K::TABLE, db.operation = "insert"))]
    pub async fn insert_with_quota_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        parent_id: Uuid,
        name: &str,
    ) -> Result<K::Row, AppError> {
        self.ensure_capacity_tx(tx, parent_id).await?;

        let row = sqlx::query_as::<Postgres, K::Row>(K::INSERT_SQL)
            .bind(parent_id)
            .bind(name)
            .fetch_one(&mut **tx)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = K::TABLE, db.operation = "update", db.record_id = %id))]
    pub async fn rename_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        name: &str,
    ) -> Result<Option<K::Row>, AppError> {
        let sql = format!(
            "UPDATE {} SET name = $2, updated_at = NOW() WHERE id = $1 AND is_deleted = FALSE RETURNING {}",
            K::TABLE,
            K::COLUMNS
        );
        let row = sqlx::query_as::<Postgres, K::Row>(&sql)
            .bind(id)
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(row)
    }
}
