//! Unit of work
//!
//! Every multi-step mutation runs inside one [`TransactionGuard`] opened by
//! [`UnitOfWork::begin`]. Steps borrow the guard's transaction, and the
//! operation ends with [`TransactionGuard::finish`], which commits on success and
//! rolls back on failure. Errors leaving `finish` are classified so raw SQL
//! failures never reach callers.
//!
//! # Example
//!
//! ```ignore
//! let mut tx = uow.begin("soft_delete_item").await?;
//! let result = async {
//!     subs.clear_thumbnail_if_tx(tx.tx(), sub_id, item_id).await?;
//!     items.soft_delete_tx(tx.tx(), item_id).await
//! }
//! .await;
//! tx.finish(result).await
//! ```

use memoria_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};

/// Opens transactions for multi-step writes.
#[derive(Clone)]
pub struct UnitOfWork {
    pool: PgPool,
}

impl UnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a new transaction for `operation` (used as a log label)
    pub async fn begin(&self, operation: &'static str) -> Result<TransactionGuard, AppError> {
        let transaction = self
            .pool
            .begin()
            .await
            .map_err(AppError::from_db)?;

        tracing::trace!(operation, "Transaction opened");

        Ok(TransactionGuard {
            transaction,
            operation,
        })
    }
}

/// An open transaction.
///
/// Dropping the guard without calling `commit`, `rollback` or `finish` rolls the
/// transaction back when the connection returns to the pool.
pub struct TransactionGuard {
    transaction: Transaction<'static, Postgres>,
    operation: &'static str,
}

impl TransactionGuard {
    /// Borrow the underlying transaction for repository `_tx` calls
    pub fn tx(&mut self) -> &mut Transaction<'static, Postgres> {
        &mut self.transaction
    }

    pub async fn commit(self) -> Result<(), AppError> {
        let operation = self.operation;
        self.transaction.commit().await.map_err(AppError::from_db)?;
        tracing::debug!(operation, "Transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), AppError> {
        let operation = self.operation;
        self.transaction
            .rollback()
            .await
            .map_err(AppError::from_db)?;
        tracing::debug!(operation, "Transaction rolled back");
        Ok(())
    }

    /// Commit if `result` is `Ok`, otherwise roll back and return the classified error.
    pub async fn finish<R>(self, result: Result<R, AppError>) -> Result<R, AppError> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let operation = self.operation;
                let err = err.classify();
                tracing::debug!(operation, error = %err, "Rolling back transaction");
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(operation, error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}
