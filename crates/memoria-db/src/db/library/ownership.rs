//! Ownership chain lookups
//!
//! Each lookup walks from a target row up to the owning account in one
//! statement. The `_tx` variants lock the target `FOR UPDATE` and the collection
//! `FOR SHARE`, so a concurrent soft-delete of any link waits for the caller's
//! transaction to finish. Item chains also lock the sub-collection `FOR UPDATE`
//! because item mutations may rewrite its thumbnail reference.

use memoria_core::AppError;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// One resolved chain from a target row to its owning account.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct OwnershipLink {
    pub target_id: Uuid,
    /// Collection id for a sub-collection, sub-collection id for an item
    pub parent_id: Option<Uuid>,
    pub owner_account_id: Uuid,
    pub target_deleted: bool,
    pub ancestors_deleted: bool,
}

/// Chain shapes that can be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipChain {
    Collection(Uuid),
    SubCollection(Uuid),
    Item(Uuid),
}

impl OwnershipChain {
    pub fn target_id(&self) -> Uuid {
        match self {
            OwnershipChain::Collection(id)
            | OwnershipChain::SubCollection(id)
            | OwnershipChain::Item(id) => *id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OwnershipChain::Collection(_) => "collection",
            OwnershipChain::SubCollection(_) => "sub-collection",
            OwnershipChain::Item(_) => "item",
        }
    }

    fn select_sql(&self) -> &'static str {
        match self {
            OwnershipChain::Collection(_) => {
                r#"
                SELECT c.id AS target_id, NULL::uuid AS parent_id, c.account_id AS owner_account_id,
                       c.is_deleted AS target_deleted, FALSE AS ancestors_deleted
                FROM collections c
                WHERE c.id = $1
                "#
            }
            OwnershipChain::SubCollection(_) => {
                r#"
                SELECT s.id AS target_id, s.collection_id AS parent_id, c.account_id AS owner_account_id,
                       s.is_deleted AS target_deleted, c.is_deleted AS ancestors_deleted
                FROM sub_collections s
                JOIN collections c ON c.id = s.collection_id
                WHERE s.id = $1
                "#
            }
            OwnershipChain::Item(_) => {
                r#"
                SELECT i.id AS target_id, i.sub_collection_id AS parent_id, c.account_id AS owner_account_id,
                       i.is_deleted AS target_deleted, (s.is_deleted OR c.is_deleted) AS ancestors_deleted
                FROM items i
                JOIN sub_collections s ON s.id = i.sub_collection_id
                JOIN collections c ON c.id = s.collection_id
                WHERE i.id = $1
                "#
            }
        }
    }

    fn lock_clause(&self) -> &'static str {
        match self {
            OwnershipChain::Collection(_) => "FOR UPDATE OF c",
            OwnershipChain::SubCollection(_) => "FOR UPDATE OF s FOR SHARE OF c",
            OwnershipChain::Item(_) => "FOR UPDATE OF i, s FOR SHARE OF c",
        }
    }
}

/// Repository for ownership chain resolution
#[derive(Clone)]
pub struct OwnershipRepository {
    pool: PgPool,
}

impl OwnershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve without locking, for read-only scope checks
    #[tracing::instrument(skip(self), fields(db.operation = "select", chain.kind = chain.label()))]
    pub async fn resolve(&self, chain: OwnershipChain) -> Result<Option<OwnershipLink>, AppError> {
        let link = sqlx::query_as::<Postgres, OwnershipLink>(chain.select_sql())
            .bind(chain.target_id())
            .fetch_optional(&self.pool)
            .await?;

        Ok(link)
    }

    /// Resolve and lock the chain for the rest of the transaction
    #[tracing::instrument(skip(self, tx), fields(db.operation = "lock", chain.kind = chain.label()))]
    pub async fn resolve_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        chain: OwnershipChain,
    ) -> Result<Option<OwnershipLink>, AppError> {
        let sql = format!("{} {}", chain.select_sql(), chain.lock_clause());
        let link = sqlx::query_as::<Postgres, OwnershipLink>(&sql)
            .bind(chain.target_id())
            .fetch_optional(&mut **tx)
            .await?;

        Ok(link)
    }
}
