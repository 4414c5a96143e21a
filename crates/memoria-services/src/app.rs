//! Service facade
//!
//! [`Memoria`] wires repositories and collaborators together. Callers go
//! through [`Memoria::session`] or [`Memoria::admin_session`], which run the
//! account status gate, before any library or moderation operation.

use anyhow::Context;
use memoria_core::{
    models::{
        Account, AccountOverview, AccountSnapshot, AccountStatus, AdminStats, Collection,
        Coordinates, CreateReportRequest, Item, ItemMetaUpdate, ItemWithTags, MapLocation,
        NewItemMeta, PasswordChangeRequest, ProfileUpdateRequest, Report, ReportView, Session,
        SessionStatus, SignupRequest, StoredPayload, SubCollection, SubCollectionDetail,
        SubCollectionSummary, ThumbnailRef,
    },
    AppError, Config,
};
use memoria_db::{
    setup_database, AccountRepository, CollectionRepository, ItemRepository, OwnershipRepository,
    ReportRepository, SessionRepository, SubCollectionRepository, TagRepository, UnitOfWork,
};
use memoria_storage::{create_storage, Storage};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::library::LibraryParts;
use crate::{
    create_geocoder, AccountService, AccountStatusGate, Argon2Verifier, AuthorizationResolver,
    Geocoder, LibraryService, ModerationEngine, PasswordVerifier, SoftDeleteEngine, UploadService,
};

#[derive(Clone)]
pub struct Memoria {
    pool: PgPool,
    accounts: AccountService,
    gate: AccountStatusGate,
    library: LibraryService,
    moderation: ModerationEngine,
}

impl Memoria {
    /// Connect, migrate and build every collaborator from configuration.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let pool = setup_database(config).await?;
        let storage = create_storage(config)
            .await
            .context("Failed to initialize storage")?;
        let geocoder = create_geocoder(&config.geocoding);

        Ok(Self::new(
            pool,
            config,
            storage,
            geocoder,
            Arc::new(Argon2Verifier),
        ))
    }

    pub fn new(
        pool: PgPool,
        config: &Config,
        storage: Arc<dyn Storage>,
        geocoder: Arc<dyn Geocoder>,
        passwords: Arc<dyn PasswordVerifier>,
    ) -> Self {
        let uow = UnitOfWork::new(pool.clone());
        let account_repository = AccountRepository::new(pool.clone());
        let session_repository = SessionRepository::new(pool.clone());
        let collections = CollectionRepository::with_quota(
            pool.clone(),
            config.quotas.max_collections_per_account,
        );
        let sub_collections = SubCollectionRepository::with_quota(
            pool.clone(),
            config.quotas.max_sub_collections_per_collection,
        );
        let items = ItemRepository::new(pool.clone());
        let ownership = OwnershipRepository::new(pool.clone());

        let uploads = UploadService::new(storage, config.uploads.clone());
        let soft_delete = SoftDeleteEngine::new(
            collections.clone(),
            sub_collections.clone(),
            items.clone(),
            account_repository.clone(),
        );
        let gate = AccountStatusGate::new(
            uow.clone(),
            account_repository.clone(),
            session_repository.clone(),
        );
        let accounts = AccountService::new(
            account_repository.clone(),
            session_repository.clone(),
            items.clone(),
            gate.clone(),
            passwords,
            uploads.clone(),
        );
        let library = LibraryService::new(LibraryParts {
            uow: uow.clone(),
            authz: AuthorizationResolver::new(ownership.clone()),
            collections,
            sub_collections: sub_collections.clone(),
            items: items.clone(),
            tags: TagRepository::new(pool.clone()),
            soft_delete: soft_delete.clone(),
            uploads,
            geocoder,
            geocode_timeout: Duration::from_millis(
                config.geocoding.connect_timeout_ms + config.geocoding.read_timeout_ms,
            ),
        });
        let moderation = ModerationEngine::new(
            uow,
            ReportRepository::new(pool.clone()),
            ownership,
            account_repository,
            session_repository,
            sub_collections,
            items,
            soft_delete,
            config.storage_capacity_bytes,
        );

        Self {
            pool,
            accounts,
            gate,
            library,
            moderation,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn gate(&self) -> &AccountStatusGate {
        &self.gate
    }

    pub fn library(&self) -> &LibraryService {
        &self.library
    }

    pub fn moderation(&self) -> &ModerationEngine {
        &self.moderation
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<Account, AppError> {
        self.accounts.signup(request).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AppError> {
        self.accounts.login(username, password).await
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<(), AppError> {
        self.accounts.logout(session_id).await
    }

    /// Pass the status gate for `session_id` and return a handle scoped to its account.
    pub async fn session(&self, session_id: Uuid) -> Result<AccountSession<'_>, AppError> {
        let account = self.gate.authenticate(session_id).await?;
        Ok(AccountSession { app: self, account })
    }

    /// Like [`Memoria::session`], additionally requiring the ADMIN role.
    pub async fn admin_session(&self, session_id: Uuid) -> Result<AdminSession<'_>, AppError> {
        let account = self.gate.authenticate(session_id).await?;
        if !account.is_admin() {
            tracing::warn!(account_id = %account.id, "Admin operation refused");
            return Err(AppError::Forbidden(format!(
                "account {} is not an administrator",
                account.id
            )));
        }
        Ok(AdminSession { app: self, account })
    }
}

/// Operations available to an authenticated account.
///
/// A handle lives for one request. Status changes made after it was issued are
/// seen by the next call to [`Memoria::session`].
pub struct AccountSession<'a> {
    app: &'a Memoria,
    account: Account,
}

impl std::fmt::Debug for AccountSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSession")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl AccountSession<'_> {
    pub fn account(&self) -> &Account {
        &self.account
    }

    fn id(&self) -> Uuid {
        self.account.id
    }

    pub async fn create_collection(&self, name: &str) -> Result<Collection, AppError> {
        self.app.library.create_collection(self.id(), name).await
    }

    pub async fn list_collections(&self) -> Result<Vec<Collection>, AppError> {
        self.app.library.list_collections(self.id()).await
    }

    pub async fn rename_collection(
        &self,
        collection_id: Uuid,
        name: &str,
    ) -> Result<Collection, AppError> {
        self.app
            .library
            .rename_collection(self.id(), collection_id, name)
            .await
    }

    pub async fn delete_collection(&self, collection_id: Uuid) -> Result<(), AppError> {
        self.app
            .library
            .delete_collection(self.id(), collection_id)
            .await
    }

    pub async fn create_sub_collection(
        &self,
        collection_id: Uuid,
        name: &str,
    ) -> Result<SubCollection, AppError> {
        self.app
            .library
            .create_sub_collection(self.id(), collection_id, name)
            .await
    }

    pub async fn list_sub_collections(
        &self,
        collection_id: Uuid,
    ) -> Result<Vec<SubCollectionSummary>, AppError> {
        self.app
            .library
            .list_sub_collections(self.id(), collection_id)
            .await
    }

    pub async fn rename_sub_collection(
        &self,
        sub_collection_id: Uuid,
        name: &str,
    ) -> Result<SubCollection, AppError> {
        self.app
            .library
            .rename_sub_collection(self.id(), sub_collection_id, name)
            .await
    }

    pub async fn soft_delete_sub_collection(&self, sub_collection_id: Uuid) -> Result<(), AppError> {
        self.app
            .library
            .soft_delete_sub_collection(self.id(), sub_collection_id)
            .await
    }

    pub async fn add_item(
        &self,
        sub_collection_id: Uuid,
        payload: StoredPayload,
        meta: NewItemMeta,
    ) -> Result<Item, AppError> {
        self.app
            .library
            .add_item(self.id(), sub_collection_id, payload, meta)
            .await
    }

    pub async fn upload_item(
        &self,
        sub_collection_id: Uuid,
        original_name: &str,
        mime_type: &str,
        data: Vec<u8>,
        meta: NewItemMeta,
    ) -> Result<Item, AppError> {
        self.app
            .library
            .upload_item(
                self.id(),
                sub_collection_id,
                original_name,
                mime_type,
                data,
                meta,
            )
            .await
    }

    pub async fn update_item_meta(
        &self,
        item_id: Uuid,
        update: ItemMetaUpdate,
    ) -> Result<(), AppError> {
        self.app
            .library
            .update_item_meta(self.id(), item_id, update)
            .await
    }

    pub async fn update_item_coordinates(
        &self,
        item_id: Uuid,
        coordinates: Option<Coordinates>,
    ) -> Result<(), AppError> {
        self.app
            .library
            .update_item_coordinates(self.id(), item_id, coordinates)
            .await
    }

    pub async fn reconcile_tags(
        &self,
        item_id: Uuid,
        names: &[String],
    ) -> Result<Vec<String>, AppError> {
        self.app
            .library
            .reconcile_tags(self.id(), item_id, names)
            .await
    }

    pub async fn item_tags(&self, item_id: Uuid) -> Result<Vec<String>, AppError> {
        self.app.library.item_tags(self.id(), item_id).await
    }

    pub async fn soft_delete_item(&self, item_id: Uuid) -> Result<(), AppError> {
        self.app.library.soft_delete_item(self.id(), item_id).await
    }

    pub async fn list_items(&self, sub_collection_id: Uuid) -> Result<Vec<ItemWithTags>, AppError> {
        self.app
            .library
            .list_items(self.id(), sub_collection_id)
            .await
    }

    pub async fn set_thumbnail(
        &self,
        sub_collection_id: Uuid,
        item_id: Uuid,
    ) -> Result<ThumbnailRef, AppError> {
        self.app
            .library
            .set_thumbnail(self.id(), sub_collection_id, item_id)
            .await
    }

    pub async fn replace_thumbnail(
        &self,
        sub_collection_id: Uuid,
        payload: StoredPayload,
    ) -> Result<ThumbnailRef, AppError> {
        self.app
            .library
            .replace_thumbnail(self.id(), sub_collection_id, payload)
            .await
    }

    pub async fn upload_thumbnail(
        &self,
        sub_collection_id: Uuid,
        original_name: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<ThumbnailRef, AppError> {
        self.app
            .library
            .upload_thumbnail(self.id(), sub_collection_id, original_name, mime_type, data)
            .await
    }

    pub async fn list_map_locations(&self) -> Result<Vec<MapLocation>, AppError> {
        self.app.library.list_map_locations(self.id()).await
    }

    pub async fn report_item(&self, item_id: Uuid, reason: &str) -> Result<Report, AppError> {
        self.app
            .moderation
            .create_report(
                self.id(),
                item_id,
                CreateReportRequest {
                    reason: reason.to_string(),
                },
            )
            .await
    }

    pub async fn post_count(&self) -> Result<i64, AppError> {
        self.app.moderation.post_count(self.id()).await
    }

    pub async fn update_profile(&self, request: ProfileUpdateRequest) -> Result<Account, AppError> {
        self.app.accounts.update_profile(self.id(), request).await
    }

    pub async fn change_password(&self, request: PasswordChangeRequest) -> Result<(), AppError> {
        self.app
            .accounts
            .change_password(&self.account, request)
            .await
    }

    /// Delete the account and everything it owns.
    pub async fn delete_account(self) -> Result<(), AppError> {
        self.app.accounts.delete_account(self.id()).await
    }
}

/// Moderation operations for an authenticated administrator.
pub struct AdminSession<'a> {
    app: &'a Memoria,
    account: Account,
}

impl std::fmt::Debug for AdminSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSession")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl AdminSession<'_> {
    pub fn account(&self) -> &Account {
        &self.account
    }

    pub async fn list_reports(&self) -> Result<Vec<ReportView>, AppError> {
        self.app.moderation.list_reports().await
    }

    pub async fn resolve_report(&self, report_id: Uuid) -> Result<(), AppError> {
        self.app.moderation.resolve(report_id).await
    }

    pub async fn resolve_report_with_removal(
        &self,
        report_id: Uuid,
        sub_collection_id: Uuid,
    ) -> Result<(), AppError> {
        self.app
            .moderation
            .resolve_with_removal(report_id, sub_collection_id)
            .await
    }

    pub async fn set_account_status(
        &self,
        target_account_id: Uuid,
        status: AccountStatus,
        penalty_days: Option<i64>,
        reason: Option<String>,
    ) -> Result<AccountSnapshot, AppError> {
        if target_account_id == self.account.id && status != AccountStatus::Active {
            return Err(AppError::InvalidInput(
                "Administrators cannot block their own account".to_string(),
            ));
        }
        self.app
            .gate
            .set_account_status(target_account_id, status, penalty_days, reason)
            .await
    }

    pub async fn check_session_status(&self, account_id: Uuid) -> Result<SessionStatus, AppError> {
        self.app.gate.check_session_status(account_id).await
    }

    pub async fn cumulative_report_count(&self, account_id: Uuid) -> Result<i64, AppError> {
        self.app.moderation.cumulative_report_count(account_id).await
    }

    pub async fn account_overview(&self) -> Result<Vec<AccountOverview>, AppError> {
        self.app.moderation.account_overview().await
    }

    pub async fn stats(&self) -> Result<AdminStats, AppError> {
        self.app.moderation.stats().await
    }

    pub async fn sub_collection_detail(
        &self,
        sub_collection_id: Uuid,
    ) -> Result<SubCollectionDetail, AppError> {
        self.app
            .moderation
            .sub_collection_detail(sub_collection_id)
            .await
    }
}
