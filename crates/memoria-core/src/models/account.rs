use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::AppError;

/// Reason recorded when an administrator blocks an account without giving one.
pub const DEFAULT_BLOCK_REASON: &str = "Policy violation.";

/// Longest suspension an administrator can hand out.
pub const MAX_PENALTY_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "account_role", rename_all = "lowercase")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRole {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "account_status", rename_all = "lowercase")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Suspended,
    Banned,
}

impl AccountStatus {
    /// Compute the penalty expiry that accompanies a transition into `self`.
    ///
    /// Only a suspension carries an expiry and it requires a day count in
    /// `1..=MAX_PENALTY_DAYS`. Every other status clears the penalty.
    pub fn penalty_end_at(
        self,
        penalty_days: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        match self {
            AccountStatus::Suspended => match penalty_days {
                Some(days) if (1..=MAX_PENALTY_DAYS).contains(&days) => Duration::try_days(days)
                    .and_then(|penalty| now.checked_add_signed(penalty))
                    .map(Some)
                    .ok_or_else(|| {
                        AppError::InvalidInput("Suspension length is out of range".to_string())
                    }),
                Some(days) if days > MAX_PENALTY_DAYS => Err(AppError::InvalidInput(format!(
                    "Suspension cannot exceed {} days",
                    MAX_PENALTY_DAYS
                ))),
                _ => Err(AppError::InvalidInput(
                    "Suspension requires a positive number of days".to_string(),
                )),
            },
            AccountStatus::Active | AccountStatus::Banned => Ok(None),
        }
    }
}

impl FromStr for AccountStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(AccountStatus::Active),
            "SUSPENDED" => Ok(AccountStatus::Suspended),
            "BANNED" => Ok(AccountStatus::Banned),
            _ => Err(AppError::InvalidInput(format!(
                "Invalid account status: {}",
                s
            ))),
        }
    }
}

impl Display for AccountStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AccountStatus::Active => write!(f, "ACTIVE"),
            AccountStatus::Suspended => write!(f, "SUSPENDED"),
            AccountStatus::Banned => write!(f, "BANNED"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub nickname: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: AccountRole,
    pub status: AccountStatus,
    pub status_reason: Option<String>,
    pub penalty_end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == AccountRole::Admin
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            status: self.status,
            status_reason: self.status_reason.clone(),
            penalty_end_at: self.penalty_end_at,
        }
    }
}

/// Status-relevant view of an account returned after a moderation transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSnapshot {
    pub id: Uuid,
    pub username: String,
    pub role: AccountRole,
    pub status: AccountStatus,
    pub status_reason: Option<String>,
    pub penalty_end_at: Option<DateTime<Utc>>,
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Suspended {
        reason: String,
        penalty_end_at: Option<DateTime<Utc>>,
    },
    Banned {
        reason: String,
    },
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }

    /// Convert a blocked status into the error carried back to callers.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            SessionStatus::Active => Ok(()),
            SessionStatus::Suspended {
                reason,
                penalty_end_at,
            } => Err(AppError::AccountBlocked {
                status: AccountStatus::Suspended,
                reason,
                penalty_end_at,
            }),
            SessionStatus::Banned { reason } => Err(AppError::AccountBlocked {
                status: AccountStatus::Banned,
                reason,
                penalty_end_at: None,
            }),
        }
    }
}

/// Request DTO for creating an account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username must be between 3 and 50 characters"
    ))]
    pub username: String,
    #[validate(email(message = "Email address is invalid"))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,
    #[validate(length(
        min = 1,
        max = 50,
        message = "Nickname must be between 1 and 50 characters"
    ))]
    pub nickname: String,
}

/// Request DTO for editing the caller's profile
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileUpdateRequest {
    #[validate(email(message = "Email address is invalid"))]
    pub email: String,
    #[validate(length(
        min = 1,
        max = 50,
        message = "Nickname must be between 1 and 50 characters"
    ))]
    pub nickname: String,
}

/// Request DTO for changing the caller's password
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspension_sets_penalty_relative_to_now() {
        let now = Utc::now();
        let end = AccountStatus::Suspended
            .penalty_end_at(Some(3), now)
            .unwrap();
        assert_eq!(end, Some(now + Duration::days(3)));
    }

    #[test]
    fn suspension_requires_positive_days() {
        let now = Utc::now();
        assert!(AccountStatus::Suspended.penalty_end_at(None, now).is_err());
        assert!(AccountStatus::Suspended.penalty_end_at(Some(0), now).is_err());
        assert!(AccountStatus::Suspended
            .penalty_end_at(Some(-2), now)
            .is_err());
    }

    #[test]
    fn suspension_length_is_capped() {
        let now = Utc::now();
        assert_eq!(
            AccountStatus::Suspended
                .penalty_end_at(Some(MAX_PENALTY_DAYS), now)
                .unwrap(),
            Some(now + Duration::days(MAX_PENALTY_DAYS))
        );
        for days in [MAX_PENALTY_DAYS + 1, 200_000_000, i64::MAX / 86_400, i64::MAX] {
            assert!(matches!(
                AccountStatus::Suspended.penalty_end_at(Some(days), now),
                Err(AppError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn ban_and_reinstate_clear_penalty() {
        let now = Utc::now();
        assert_eq!(AccountStatus::Banned.penalty_end_at(Some(5), now).unwrap(), None);
        assert_eq!(AccountStatus::Active.penalty_end_at(None, now).unwrap(), None);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("suspended".parse::<AccountStatus>().unwrap(), AccountStatus::Suspended);
        assert_eq!(" BANNED ".parse::<AccountStatus>().unwrap(), AccountStatus::Banned);
        assert!("frozen".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn blocked_session_status_becomes_account_blocked_error() {
        let err = SessionStatus::Banned {
            reason: DEFAULT_BLOCK_REASON.to_string(),
        }
        .into_result()
        .unwrap_err();
        match err {
            AppError::AccountBlocked {
                status, reason, ..
            } => {
                assert_eq!(status, AccountStatus::Banned);
                assert_eq!(reason, DEFAULT_BLOCK_REASON);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(SessionStatus::Active.into_result().is_ok());
    }
}
