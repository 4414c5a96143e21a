//! Account status gate
//!
//! Status is re-read from the database on every check and never cached in a
//! session. A blocked status invalidates the account's live sessions at the
//! first check that observes it. An expired suspension is lifted on the check
//! that finds it expired.

use chrono::{DateTime, Utc};
use memoria_core::{
    models::{Account, AccountSnapshot, AccountStatus, SessionStatus, DEFAULT_BLOCK_REASON},
    AppError,
};
use memoria_db::{AccountRepository, SessionRepository, UnitOfWork};
use uuid::Uuid;

#[derive(Clone)]
pub struct AccountStatusGate {
    uow: UnitOfWork,
    accounts: AccountRepository,
    sessions: SessionRepository,
}

impl AccountStatusGate {
    pub fn new(uow: UnitOfWork, accounts: AccountRepository, sessions: SessionRepository) -> Self {
        Self {
            uow,
            accounts,
            sessions,
        }
    }

    /// Admin transition of `target_account_id` into `status`.
    ///
    /// Suspension needs a positive `penalty_days`. Banning and reinstating clear
    /// the penalty. Blocking without a reason records [`DEFAULT_BLOCK_REASON`].
    #[tracing::instrument(skip(self, reason), fields(target_account_id = %target_account_id, %status))]
    pub async fn set_account_status(
        &self,
        target_account_id: Uuid,
        status: AccountStatus,
        penalty_days: Option<i64>,
        reason: Option<String>,
    ) -> Result<AccountSnapshot, AppError> {
        let penalty_end_at = status.penalty_end_at(penalty_days, Utc::now())?;
        let reason = block_reason(status, reason);

        let mut tx = self.uow.begin("set_account_status").await?;
        let result = async {
            self.accounts
                .get_for_update_tx(tx.tx(), target_account_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("account {} not found", target_account_id))
                })?;

            self.accounts
                .set_status_tx(
                    tx.tx(),
                    target_account_id,
                    status,
                    reason.as_deref(),
                    penalty_end_at,
                )
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("account {} not found", target_account_id))
                })
        }
        .await;
        let account = tx.finish(result).await?;

        tracing::info!(
            penalty_end_at = ?account.penalty_end_at,
            "Account status changed"
        );
        Ok(account.snapshot())
    }

    /// Current gate decision for an account, invalidating its sessions when blocked.
    #[tracing::instrument(skip(self), fields(account_id = %account_id))]
    pub async fn check_session_status(&self, account_id: Uuid) -> Result<SessionStatus, AppError> {
        let account = self
            .accounts
            .get(account_id)
            .await
            .map_err(AppError::classify)?
            .ok_or_else(|| AppError::NotFound(format!("account {} not found", account_id)))?;

        let (_, status) = self.evaluate(account).await?;
        Ok(status)
    }

    /// Resolve a session to its account, or fail if the session is dead or the
    /// account is blocked.
    #[tracing::instrument(skip(self), fields(session_id = %session_id))]
    pub async fn authenticate(&self, session_id: Uuid) -> Result<Account, AppError> {
        let session = self
            .sessions
            .get(session_id)
            .await
            .map_err(AppError::classify)?
            .filter(|session| session.is_live())
            .ok_or_else(|| AppError::Unauthorized("Session is not valid".to_string()))?;

        let account = self
            .accounts
            .get(session.account_id)
            .await
            .map_err(AppError::classify)?
            .ok_or_else(|| AppError::Unauthorized("Session is not valid".to_string()))?;

        let (account, status) = self.evaluate(account).await?;
        status.into_result()?;

        self.sessions
            .touch(session_id)
            .await
            .map_err(AppError::classify)?;
        Ok(account)
    }

    async fn evaluate(&self, account: Account) -> Result<(Account, SessionStatus), AppError> {
        let account = if suspension_expired(&account, Utc::now()) {
            match self
                .accounts
                .lift_expired_suspension(account.id)
                .await
                .map_err(AppError::classify)?
            {
                Some(lifted) => {
                    tracing::info!(account_id = %lifted.id, "Expired suspension lifted");
                    lifted
                }
                // Someone else changed the row first; decide on what is stored now
                None => self
                    .accounts
                    .get(account.id)
                    .await
                    .map_err(AppError::classify)?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("account {} not found", account.id))
                    })?,
            }
        } else {
            account
        };

        let status = session_status_of(&account);
        if !status.is_active() {
            let reason = match account.status {
                AccountStatus::Banned => "account banned",
                _ => "account suspended",
            };
            let invalidated = self
                .sessions
                .invalidate_all_for_account(account.id, reason)
                .await
                .map_err(AppError::classify)?;
            if invalidated > 0 {
                tracing::info!(
                    account_id = %account.id,
                    invalidated,
                    "Sessions invalidated for blocked account"
                );
            }
        }

        Ok((account, status))
    }
}

fn block_reason(status: AccountStatus, reason: Option<String>) -> Option<String> {
    match status {
        AccountStatus::Active => None,
        AccountStatus::Suspended | AccountStatus::Banned => Some(
            reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string()),
        ),
    }
}

fn suspension_expired(account: &Account, now: DateTime<Utc>) -> bool {
    account.status == AccountStatus::Suspended
        && account.penalty_end_at.is_some_and(|end| end <= now)
}

fn session_status_of(account: &Account) -> SessionStatus {
    let reason = || {
        account
            .status_reason
            .clone()
            .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string())
    };
    match account.status {
        AccountStatus::Active => SessionStatus::Active,
        AccountStatus::Suspended => SessionStatus::Suspended {
            reason: reason(),
            penalty_end_at: account.penalty_end_at,
        },
        AccountStatus::Banned => SessionStatus::Banned { reason: reason() },
    }
}
