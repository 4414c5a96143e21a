//! Account lifecycle: signup, login, logout and self-deletion

use memoria_core::{
    models::{
        Account, AccountRole, PasswordChangeRequest, ProfileUpdateRequest, Session, SignupRequest,
    },
    validation::validate_request,
    AppError,
};
use memoria_db::{AccountRepository, ItemRepository, SessionRepository};
use std::sync::Arc;
use uuid::Uuid;

use crate::{AccountStatusGate, PasswordVerifier, UploadService};

#[derive(Clone)]
pub struct AccountService {
    accounts: AccountRepository,
    sessions: SessionRepository,
    items: ItemRepository,
    gate: AccountStatusGate,
    passwords: Arc<dyn PasswordVerifier>,
    uploads: UploadService,
}

impl AccountService {
    pub fn new(
        accounts: AccountRepository,
        sessions: SessionRepository,
        items: ItemRepository,
        gate: AccountStatusGate,
        passwords: Arc<dyn PasswordVerifier>,
        uploads: UploadService,
    ) -> Self {
        Self {
            accounts,
            sessions,
            items,
            gate,
            passwords,
            uploads,
        }
    }

    /// Create a regular account.
    pub async fn signup(&self, request: SignupRequest) -> Result<Account, AppError> {
        self.create_account(request, AccountRole::User).await
    }

    #[tracing::instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_account(
        &self,
        request: SignupRequest,
        role: AccountRole,
    ) -> Result<Account, AppError> {
        let request = SignupRequest {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_string(),
            nickname: request.nickname.trim().to_string(),
            password: request.password,
        };
        validate_request(&request)?;

        let password_hash = self.passwords.hash(&request.password)?;
        let account = self
            .accounts
            .create(
                &request.username,
                &request.email,
                &request.nickname,
                &password_hash,
                role,
            )
            .await
            .map_err(|e| match e.classify() {
                AppError::Conflict(_) => {
                    AppError::Conflict("Username or email is already registered".to_string())
                }
                other => other,
            })?;

        tracing::info!(account_id = %account.id, ?role, "Account created");
        Ok(account)
    }

    /// Check credentials and the account gate, then open a session.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AppError> {
        let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

        let account = self
            .accounts
            .get_by_username(username.trim())
            .await
            .map_err(AppError::classify)?
            .ok_or_else(invalid)?;

        if !self.passwords.verify(&account, password)? {
            tracing::warn!(account_id = %account.id, "Login rejected");
            return Err(invalid());
        }

        self.gate
            .check_session_status(account.id)
            .await?
            .into_result()?;

        let session = self
            .sessions
            .create(account.id)
            .await
            .map_err(AppError::classify)?;
        tracing::info!(account_id = %account.id, session_id = %session.id, "Session opened");
        Ok(session)
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<(), AppError> {
        self.sessions
            .invalidate(session_id, "logout")
            .await
            .map_err(AppError::classify)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, request), fields(account_id = %account_id))]
    pub async fn update_profile(
        &self,
        account_id: Uuid,
        request: ProfileUpdateRequest,
    ) -> Result<Account, AppError> {
        let request = ProfileUpdateRequest {
            email: request.email.trim().to_string(),
            nickname: request.nickname.trim().to_string(),
        };
        validate_request(&request)?;

        self.accounts
            .update_profile(account_id, &request.nickname, &request.email)
            .await
            .map_err(|e| match e.classify() {
                AppError::Conflict(_) => {
                    AppError::Conflict("Email is already registered".to_string())
                }
                other => other,
            })?
            .ok_or_else(|| AppError::NotFound(format!("account {} not found", account_id)))
    }

    /// Replace the password after re-checking the current one.
    #[tracing::instrument(skip(self, account, request), fields(account_id = %account.id))]
    pub async fn change_password(
        &self,
        account: &Account,
        request: PasswordChangeRequest,
    ) -> Result<(), AppError> {
        validate_request(&request)?;
        if !self.passwords.verify(account, &request.current_password)? {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash = self.passwords.hash(&request.new_password)?;
        if self
            .accounts
            .set_password_hash(account.id, &password_hash)
            .await
            .map_err(AppError::classify)?
            == 0
        {
            return Err(AppError::NotFound(format!(
                "account {} not found",
                account.id
            )));
        }

        tracing::info!("Password changed");
        Ok(())
    }

    /// Hard-delete an account with its whole hierarchy, then remove its stored files.
    #[tracing::instrument(skip(self))]
    pub async fn delete_account(&self, account_id: Uuid) -> Result<(), AppError> {
        let keys = self
            .items
            .storage_keys_for_account(account_id)
            .await
            .map_err(AppError::classify)?;

        if self
            .accounts
            .delete(account_id)
            .await
            .map_err(AppError::classify)?
            == 0
        {
            return Err(AppError::NotFound(format!(
                "account {} not found",
                account_id
            )));
        }

        for key in &keys {
            self.uploads.discard(key).await;
        }

        tracing::info!(objects = keys.len(), "Account deleted");
        Ok(())
    }
}
