//! Password hashing with bcrypt.
//!
//! Hashes are stored in the modular crypt form (`$2b$<cost>$...`), which
//! carries its own salt and cost, so verification needs nothing else.
//! Both calls are CPU-bound; [`crate::AuthService`] runs them on the
//! blocking pool.

use crate::error::{AuthError, Result};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Default bcrypt work factor.
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash a password with a fresh random salt.
///
/// # Errors
///
/// - [`AuthError::Validation`] if the password is shorter than
///   [`MIN_PASSWORD_LEN`]
/// - [`AuthError::Internal`] for a cost outside bcrypt's range (4..=31)
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    bcrypt::hash(password, cost)
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored hash.
///
/// # Errors
///
/// Returns [`AuthError::Internal`] if the stored hash is not a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash)
        .map_err(|e| AuthError::Internal(format!("stored password hash is malformed: {e}")))
}
