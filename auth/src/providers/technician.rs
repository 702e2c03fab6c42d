//! Technician repository trait.

use super::AuthFuture;
use crate::state::Technician;

/// Technician account storage.
pub trait TechnicianRepository: Send + Sync {
    /// Look up an account by username (exact match).
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::Database`] if storage fails.
    fn find_by_username(&self, username: String) -> AuthFuture<'_, Option<Technician>>;

    /// Create an account.
    ///
    /// # Errors
    ///
    /// - [`crate::AuthError::UsernameTaken`] if the username exists
    /// - [`crate::AuthError::Database`] if storage fails
    fn create(&self, technician: Technician) -> AuthFuture<'_, ()>;
}
