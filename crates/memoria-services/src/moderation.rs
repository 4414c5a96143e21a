//! Moderation engine
//!
//! Reports move one way from `new` to `processed`. Resolution with removal
//! soft-deletes the reported sub-collection and processes the report in one
//! transaction, so neither half is ever visible without the other.

use memoria_core::{
    models::{
        AccountOverview, AdminStats, CreateReportRequest, Report, ReportView, SubCollectionDetail,
    },
    validation::validate_request,
    AppError,
};
use memoria_db::{
    AccountRepository, ItemRepository, OwnershipChain, OwnershipRepository, ReportRepository,
    SessionRepository, SubCollectionRepository, UnitOfWork,
};
use uuid::Uuid;

use crate::SoftDeleteEngine;

#[derive(Clone)]
pub struct ModerationEngine {
    uow: UnitOfWork,
    reports: ReportRepository,
    ownership: OwnershipRepository,
    accounts: AccountRepository,
    sessions: SessionRepository,
    sub_collections: SubCollectionRepository,
    items: ItemRepository,
    soft_delete: SoftDeleteEngine,
    capacity_bytes: i64,
}

impl ModerationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        uow: UnitOfWork,
        reports: ReportRepository,
        ownership: OwnershipRepository,
        accounts: AccountRepository,
        sessions: SessionRepository,
        sub_collections: SubCollectionRepository,
        items: ItemRepository,
        soft_delete: SoftDeleteEngine,
        capacity_bytes: i64,
    ) -> Self {
        Self {
            uow,
            reports,
            ownership,
            accounts,
            sessions,
            sub_collections,
            items,
            soft_delete,
            capacity_bytes,
        }
    }

    /// File a report against a live item. One report per reporter and item.
    #[tracing::instrument(skip(self, request), fields(reporter_id = %reporter_id, item_id = %item_id))]
    pub async fn create_report(
        &self,
        reporter_id: Uuid,
        item_id: Uuid,
        request: CreateReportRequest,
    ) -> Result<Report, AppError> {
        let request = CreateReportRequest {
            reason: request.reason.trim().to_string(),
        };
        validate_request(&request)?;

        let mut tx = self.uow.begin("create_report").await?;
        let result = async {
            let link = self
                .ownership
                .resolve_tx(tx.tx(), OwnershipChain::Item(item_id))
                .await?
                .filter(|link| !link.target_deleted && !link.ancestors_deleted)
                .ok_or_else(|| AppError::NotFound(format!("item {} not found", item_id)))?;

            if link.owner_account_id == reporter_id {
                return Err(AppError::InvalidInput(
                    "You cannot report your own content".to_string(),
                ));
            }

            self.reports
                .create_tx(tx.tx(), item_id, reporter_id, &request.reason)
                .await
                .map_err(|e| match e.classify() {
                    AppError::Conflict(_) => {
                        AppError::Conflict("You have already reported this item".to_string())
                    }
                    other => other,
                })
        }
        .await;
        let report = tx.finish(result).await?;

        tracing::info!(report_id = %report.id, "Report filed");
        Ok(report)
    }

    /// Every report with the current state of its content, newest first.
    pub async fn list_reports(&self) -> Result<Vec<ReportView>, AppError> {
        self.reports.list_views().await.map_err(AppError::classify)
    }

    /// Mark a report processed without touching its content.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, report_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.uow.begin("resolve_report").await?;
        let result = async {
            if self.reports.mark_processed_tx(tx.tx(), report_id).await? == 0 {
                return Err(AppError::NotFound(format!(
                    "report {} not found or already processed",
                    report_id
                )));
            }
            Ok(())
        }
        .await;
        tx.finish(result).await?;

        tracing::info!("Report resolved");
        Ok(())
    }

    /// Soft-delete the reported sub-collection and process the report atomically.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_with_removal(
        &self,
        report_id: Uuid,
        sub_collection_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = self.uow.begin("resolve_report_with_removal").await?;
        let result = async {
            self.reports
                .get_for_update_tx(tx.tx(), report_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("report {} not found", report_id)))?;

            let reported = self.reports.sub_collection_of_tx(tx.tx(), report_id).await?;
            if reported != Some(sub_collection_id) {
                return Err(AppError::InvalidInput(format!(
                    "report {} does not concern sub-collection {}",
                    report_id, sub_collection_id
                )));
            }

            self.soft_delete
                .soft_delete_sub_collection_tx(tx.tx(), sub_collection_id)
                .await?;

            if self.reports.mark_processed_tx(tx.tx(), report_id).await? == 0 {
                return Err(AppError::NotFound(format!(
                    "report {} already processed",
                    report_id
                )));
            }
            Ok(())
        }
        .await;
        tx.finish(result).await?;

        tracing::info!("Report resolved with content removal");
        Ok(())
    }

    /// Reports ever filed against an account's items.
    pub async fn cumulative_report_count(&self, account_id: Uuid) -> Result<i64, AppError> {
        self.accounts
            .report_count(account_id)
            .await
            .map_err(AppError::classify)
    }

    pub async fn post_count(&self, account_id: Uuid) -> Result<i64, AppError> {
        self.soft_delete
            .post_count(account_id)
            .await
            .map_err(AppError::classify)
    }

    pub async fn account_overview(&self) -> Result<Vec<AccountOverview>, AppError> {
        self.accounts
            .list_overview()
            .await
            .map_err(AppError::classify)
    }

    pub async fn stats(&self) -> Result<AdminStats, AppError> {
        let total_accounts = self.accounts.count().await.map_err(AppError::classify)?;
        let used_bytes = self.accounts.used_bytes().await.map_err(AppError::classify)?;
        let live_sessions = self
            .sessions
            .count_live()
            .await
            .map_err(AppError::classify)?;

        Ok(AdminStats {
            total_accounts,
            used_bytes,
            capacity_bytes: self.capacity_bytes,
            live_sessions,
        })
    }

    /// A sub-collection with all of its items, deleted ones included.
    #[tracing::instrument(skip(self))]
    pub async fn sub_collection_detail(
        &self,
        sub_collection_id: Uuid,
    ) -> Result<SubCollectionDetail, AppError> {
        let not_found =
            || AppError::NotFound(format!("sub-collection {} not found", sub_collection_id));

        let sub_collection = self
            .sub_collections
            .get(sub_collection_id)
            .await
            .map_err(AppError::classify)?
            .ok_or_else(not_found)?;

        let (owner_account_id, owner_username) = self
            .accounts
            .owner_of_collection(sub_collection.collection_id)
            .await
            .map_err(AppError::classify)?
            .ok_or_else(not_found)?;

        let items = self
            .items
            .list_all(sub_collection_id)
            .await
            .map_err(AppError::classify)?;

        Ok(SubCollectionDetail {
            sub_collection,
            owner_account_id,
            owner_username,
            items,
        })
    }
}
