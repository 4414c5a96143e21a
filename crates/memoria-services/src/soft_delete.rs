//! Soft deletion
//!
//! Rows are never removed; they are flagged `is_deleted` with a timestamp.
//! Deleting an item also clears any thumbnail reference to it in the same
//! transaction, so no live sub-collection ever points at a deleted item.

use memoria_core::AppError;
use memoria_db::{AccountRepository, CollectionRepository, ItemRepository, SubCollectionRepository};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct SoftDeleteEngine {
    collections: CollectionRepository,
    sub_collections: SubCollectionRepository,
    items: ItemRepository,
    accounts: AccountRepository,
}

impl SoftDeleteEngine {
    pub fn new(
        collections: CollectionRepository,
        sub_collections: SubCollectionRepository,
        items: ItemRepository,
        accounts: AccountRepository,
    ) -> Self {
        Self {
            collections,
            sub_collections,
            items,
            accounts,
        }
    }

    /// Clear the parent's thumbnail reference if it points here, then mark the item deleted.
    #[tracing::instrument(skip(self, tx), fields(item_id = %item_id))]
    pub async fn soft_delete_item_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
    ) -> Result<(), AppError> {
        let item = self
            .items
            .get_tx(tx, item_id)
            .await?
            .filter(|item| !item.is_deleted)
            .ok_or_else(|| AppError::NotFound(format!("item {} not found", item_id)))?;

        let cleared = self
            .sub_collections
            .clear_thumbnail_if_tx(tx, item.sub_collection_id, item_id)
            .await?;

        if self.items.soft_delete_tx(tx, item_id).await? == 0 {
            return Err(AppError::NotFound(format!("item {} not found", item_id)));
        }

        tracing::info!(
            sub_collection_id = %item.sub_collection_id,
            thumbnail_cleared = cleared > 0,
            "Item soft-deleted"
        );
        Ok(())
    }

    /// Mark a sub-collection deleted. Its items keep their own flags.
    #[tracing::instrument(skip(self, tx), fields(sub_collection_id = %sub_collection_id))]
    pub async fn soft_delete_sub_collection_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        sub_collection_id: Uuid,
    ) -> Result<(), AppError> {
        if self.sub_collections.soft_delete_tx(tx, sub_collection_id).await? == 0 {
            return Err(AppError::NotFound(format!(
                "sub-collection {} not found",
                sub_collection_id
            )));
        }

        tracing::info!("Sub-collection soft-deleted");
        Ok(())
    }

    /// Mark a collection and its live sub-collections deleted.
    #[tracing::instrument(skip(self, tx), fields(collection_id = %collection_id))]
    pub async fn soft_delete_collection_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        collection_id: Uuid,
    ) -> Result<(), AppError> {
        let children = self
            .sub_collections
            .soft_delete_children_tx(tx, collection_id)
            .await?;

        if self.collections.soft_delete_tx(tx, collection_id).await? == 0 {
            return Err(AppError::NotFound(format!(
                "collection {} not found",
                collection_id
            )));
        }

        tracing::info!(sub_collections = children, "Collection soft-deleted");
        Ok(())
    }

    /// Live sub-collections across an account's live collections.
    pub async fn post_count(&self, account_id: Uuid) -> Result<i64, AppError> {
        self.accounts.post_count(account_id).await
    }
}
