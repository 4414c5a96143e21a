//! Tag reconciliation

use memoria_core::{validation::normalize_tag_names, AppError};
use memoria_db::TagRepository;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Replaces an item's tag set with a requested one.
#[derive(Clone)]
pub struct TagReconciler {
    tags: TagRepository,
}

impl TagReconciler {
    pub fn new(tags: TagRepository) -> Self {
        Self { tags }
    }

    /// Make the item's tags exactly the normalized `names`.
    ///
    /// Missing tags are created, and links not in the set are removed. Tag rows
    /// are never deleted. An empty set clears every link. Returns the applied names.
    #[tracing::instrument(skip(self, tx, names), fields(item_id = %item_id))]
    pub async fn reconcile_tags_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
        names: &[String],
    ) -> Result<Vec<String>, AppError> {
        let names = normalize_tag_names(names)?;

        let removed = self.tags.unlink_all_tx(tx, item_id).await?;
        for name in &names {
            let tag = self.tags.find_or_create_tx(tx, name).await?;
            self.tags.link_tx(tx, item_id, tag.id).await?;
        }

        tracing::debug!(removed, applied = names.len(), "Tags reconciled");
        Ok(names)
    }

    pub async fn names_for_item(&self, item_id: Uuid) -> Result<Vec<String>, AppError> {
        self.tags.names_for_item(item_id).await
    }
}
