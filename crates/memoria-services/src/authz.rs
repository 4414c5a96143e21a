//! Ownership authorization
//!
//! Every mutation of a collection, sub-collection or item first resolves the
//! chain from the target up to its owning account. A missing target, a foreign
//! owner and a soft-deleted link all produce the same `Forbidden` error so the
//! caller learns nothing about resources it does not own.

use memoria_core::AppError;
use memoria_db::{OwnershipChain, OwnershipLink, OwnershipRepository};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct AuthorizationResolver {
    ownership: OwnershipRepository,
}

impl AuthorizationResolver {
    pub fn new(ownership: OwnershipRepository) -> Self {
        Self { ownership }
    }

    /// Resolve and lock the chain inside `tx`, failing unless `account_id` owns it.
    #[tracing::instrument(skip(self, tx), fields(chain.kind = chain.label(), target_id = %chain.target_id()))]
    pub async fn resolve_ownership_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
        chain: OwnershipChain,
    ) -> Result<OwnershipLink, AppError> {
        let link = self.ownership.resolve_tx(tx, chain).await?;
        check_link(link, account_id, chain)
    }

    /// Unlocked variant for read paths.
    #[tracing::instrument(skip(self), fields(chain.kind = chain.label(), target_id = %chain.target_id()))]
    pub async fn resolve_ownership(
        &self,
        account_id: Uuid,
        chain: OwnershipChain,
    ) -> Result<OwnershipLink, AppError> {
        let link = self.ownership.resolve(chain).await?;
        check_link(link, account_id, chain)
    }
}

fn check_link(
    link: Option<OwnershipLink>,
    account_id: Uuid,
    chain: OwnershipChain,
) -> Result<OwnershipLink, AppError> {
    let denied = || {
        AppError::Forbidden(format!(
            "account {} may not access {} {}",
            account_id,
            chain.label(),
            chain.target_id()
        ))
    };

    let link = link.ok_or_else(denied)?;
    if link.owner_account_id != account_id {
        tracing::warn!(
            account_id = %account_id,
            target_id = %chain.target_id(),
            "Ownership check failed"
        );
        return Err(denied());
    }
    if link.target_deleted || link.ancestors_deleted {
        return Err(denied());
    }
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(owner: Uuid, target_deleted: bool, ancestors_deleted: bool) -> OwnershipLink {
        OwnershipLink {
            target_id: Uuid::new_v4(),
            parent_id: Some(Uuid::new_v4()),
            owner_account_id: owner,
            target_deleted,
            ancestors_deleted,
        }
    }

    #[test]
    fn owner_of_live_chain_passes() {
        let owner = Uuid::new_v4();
        let chain = OwnershipChain::Item(Uuid::new_v4());
        let resolved = check_link(Some(link(owner, false, false)), owner, chain).unwrap();
        assert_eq!(resolved.owner_account_id, owner);
    }

    #[test]
    fn missing_and_foreign_targets_look_the_same() {
        let owner = Uuid::new_v4();
        let chain = OwnershipChain::SubCollection(Uuid::new_v4());

        let missing = check_link(None, owner, chain).unwrap_err();
        let foreign = check_link(Some(link(Uuid::new_v4(), false, false)), owner, chain).unwrap_err();

        assert!(matches!(missing, AppError::Forbidden(_)));
        assert!(matches!(foreign, AppError::Forbidden(_)));
        assert_eq!(missing.to_string(), foreign.to_string());
    }

    #[test]
    fn deleted_links_are_rejected() {
        let owner = Uuid::new_v4();
        let chain = OwnershipChain::Item(Uuid::new_v4());

        for (target_deleted, ancestors_deleted) in [(true, false), (false, true), (true, true)] {
            let result = check_link(
                Some(link(owner, target_deleted, ancestors_deleted)),
                owner,
                chain,
            );
            assert!(matches!(result, Err(AppError::Forbidden(_))));
        }
    }
}
