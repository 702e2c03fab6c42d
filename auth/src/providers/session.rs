//! Session store trait.

use super::AuthFuture;
use crate::state::Session;

/// Session storage, keyed by token digest.
///
/// # Implementation Notes
///
/// - Sessions live for the configured TTL (8 hours by default)
/// - Only token digests are stored, never raw tokens
/// - Expiry is checked by the service; stores may also purge lazily
pub trait SessionStore: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::Database`] if storage fails.
    fn create(&self, session: Session) -> AuthFuture<'_, ()>;

    /// Look up a session by token digest.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::Database`] if storage fails.
    fn find(&self, token_digest: String) -> AuthFuture<'_, Option<Session>>;

    /// Remove a session. Removing an unknown session is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::Database`] if storage fails.
    fn delete(&self, token_digest: String) -> AuthFuture<'_, ()>;
}
