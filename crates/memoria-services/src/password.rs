//! Password hashing

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier as _, SaltString},
    Argon2,
};
use memoria_core::{models::Account, AppError};
use rand_core::OsRng;

/// Hashes new secrets and checks them against stored account hashes.
pub trait PasswordVerifier: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, AppError>;

    fn verify(&self, account: &Account, secret: &str) -> Result<bool, AppError>;
}

/// Argon2id with the crate's default parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Verifier;

impl PasswordVerifier for Argon2Verifier {
    fn hash(&self, secret: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    fn verify(&self, account: &Account, secret: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(&account.password_hash)
            .map_err(|e| AppError::Internal(format!("Invalid hash format: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    }
}
