//! Account credentials: Argon2id password hashing and the login-side checks.
//!
//! Digests are PHC strings, so parameters and salt travel inside the stored
//! value and can evolve without a store migration.

use anyhow::Result;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use taskhub_store::{DomainError, Snapshot};

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(digest.to_string())
}

/// Verify a plaintext password against a stored digest. Malformed digests
/// verify as false rather than erroring.
pub fn verify_password(plain: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Validate a username string.
///
/// Rules:
/// - Must be 3--24 characters long.
/// - Only ASCII alphanumeric characters and underscores allowed.
///
/// Returns `Ok(())` if valid, or `Err` with a human-readable message.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("username cannot be empty".to_string());
    }
    if username.len() < 3 {
        return Err("username must be at least 3 characters".to_string());
    }
    if username.len() > 24 {
        return Err("username must be 24 characters or less".to_string());
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err("username can only contain letters, numbers, and underscores".to_string());
    }
    Ok(())
}

/// Check credentials for login. Unknown users and wrong passwords collapse
/// into the same [`DomainError::InvalidCredentials`] so replies cannot be
/// used to enumerate usernames.
pub fn login(snapshot: &Snapshot, username: &str, password: &str) -> Result<(), DomainError> {
    let Some(digest) = snapshot.users.get(username) else {
        return Err(DomainError::InvalidCredentials);
    };
    if verify_password(password, digest) {
        Ok(())
    } else {
        Err(DomainError::InvalidCredentials)
    }
}

/// Same check as [`login`], gating entry into the account-deletion
/// confirmation state. Confirmation itself does not re-verify.
pub fn verify_for_deletion(
    snapshot: &Snapshot,
    username: &str,
    password: &str,
) -> Result<(), DomainError> {
    login(snapshot, username, password)
}
