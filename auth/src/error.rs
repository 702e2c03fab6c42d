//! Error types for technician authentication.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Authentication and account errors.
///
/// The web layer maps each variant to one HTTP status: missing or wrong
/// credentials are 401, a bad or expired token is 403.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// No bearer token was supplied.
    #[error("Authentication required")]
    MissingCredentials,

    /// Unknown username or wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Token is malformed or unknown.
    #[error("Invalid token")]
    InvalidToken,

    /// Token was valid but its session has expired.
    #[error("Session has expired")]
    SessionExpired,

    // ═══════════════════════════════════════════════════════════
    // Account Errors
    // ═══════════════════════════════════════════════════════════

    /// Username already registered.
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    /// Rejected signup or login input.
    #[error("{0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Storage operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns `true` if this error is due to caller input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use repair_desk_auth::AuthError;
    /// assert!(AuthError::InvalidCredentials.is_user_error());
    /// assert!(!AuthError::Database("down".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Database(_) | Self::Internal(_))
    }

    /// Returns `true` if the caller supplied no credentials at all
    /// (as opposed to bad ones).
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::MissingCredentials | Self::InvalidCredentials)
    }
}
