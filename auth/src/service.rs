//! Technician signup, login and token validation.

use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::password::{hash_password, verify_password};
use crate::providers::{SessionStore, TechnicianRepository};
use crate::state::{IssuedToken, Session, Technician, TechnicianId, TechnicianProfile};
use crate::token::{generate_token, looks_like_token, token_digest};
use repair_desk_core::{Actor, Clock, Role};
use std::sync::Arc;

/// Allowed username length.
pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=64;

/// Account and session management for technicians.
#[derive(Clone)]
pub struct AuthService {
    technicians: Arc<dyn TechnicianRepository>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl AuthService {
    /// Create the service.
    #[must_use]
    pub fn new(
        technicians: Arc<dyn TechnicianRepository>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            technicians,
            sessions,
            clock,
            config,
        }
    }

    /// Register a technician.
    ///
    /// `role` defaults to `tech`. Admin accounts cannot be self-registered.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] for a bad username, short password or
    ///   admin role
    /// - [`AuthError::UsernameTaken`] if the username exists
    pub async fn signup(
        &self,
        username: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<TechnicianProfile> {
        let role = role.unwrap_or_default();
        if role == Role::Admin {
            return Err(AuthError::Validation(
                "Admin accounts cannot be created through signup".to_string(),
            ));
        }
        self.register(username, password, role).await
    }

    /// Create the admin account if it does not exist yet.
    ///
    /// Returns `true` if an account was created.
    ///
    /// # Errors
    ///
    /// Same as [`Self::signup`], except that an existing username is not an
    /// error.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<bool> {
        if self
            .technicians
            .find_by_username(username.trim().to_string())
            .await?
            .is_some()
        {
            return Ok(false);
        }
        match self.register(username, password, Role::Admin).await {
            Ok(_) => Ok(true),
            Err(AuthError::UsernameTaken(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn hash_in_pool(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.config.hash_cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| AuthError::Internal(format!("password hashing task failed: {e}")))?
    }

    async fn verify_in_pool(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("password check task failed: {e}")))?
    }

    async fn register(&self, username: &str, password: &str, role: Role) -> Result<TechnicianProfile> {
        let username = validate_username(username)?;
        let password_hash = self.hash_in_pool(password).await?;
        let technician = Technician {
            id: TechnicianId::new(),
            username,
            password_hash,
            role,
            created_at: self.clock.now(),
        };
        self.technicians.create(technician.clone()).await?;
        tracing::info!(username = %technician.username, role = %role, "Technician registered");
        Ok(TechnicianProfile::from(&technician))
    }

    /// Verify credentials and open a session.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] for an unknown user or wrong
    /// password.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken> {
        let Some(technician) = self
            .technicians
            .find_by_username(username.trim().to_string())
            .await?
        else {
            tracing::debug!(username, "Login for unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_in_pool(password, &technician.password_hash).await? {
            tracing::warn!(username = %technician.username, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = generate_token();
        let issued_at = self.clock.now();
        let expires_at = issued_at + self.config.session_ttl;
        self.sessions
            .create(Session {
                token_digest: token_digest(&token),
                technician_id: technician.id,
                username: technician.username.clone(),
                role: technician.role,
                issued_at,
                expires_at,
            })
            .await?;

        tracing::info!(username = %technician.username, "Technician logged in");
        Ok(IssuedToken {
            token,
            expires_at,
            role: technician.role,
        })
    }

    /// Resolve a bearer token to the technician it belongs to.
    ///
    /// Expired sessions are removed.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidToken`] for a malformed or unknown token
    /// - [`AuthError::SessionExpired`] for an expired session
    pub async fn authenticate(&self, token: &str) -> Result<Actor> {
        if !looks_like_token(token) {
            return Err(AuthError::InvalidToken);
        }
        let digest = token_digest(token);
        let session = self
            .sessions
            .find(digest.clone())
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if session.is_expired(self.clock.now()) {
            self.sessions.delete(digest).await?;
            tracing::debug!(username = %session.username, "Session expired");
            return Err(AuthError::SessionExpired);
        }
        Ok(session.actor())
    }

    /// End the session for `token`. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// [`AuthError::Database`] if storage fails.
    pub async fn logout(&self, token: &str) -> Result<()> {
        if looks_like_token(token) {
            self.sessions.delete(token_digest(token)).await?;
        }
        Ok(())
    }
}

/// Trim and check a username.
///
/// # Errors
///
/// [`AuthError::Validation`] unless the name is 3 to 64 characters of
/// `[A-Za-z0-9._-]`.
pub fn validate_username(raw: &str) -> Result<String> {
    let username = raw.trim();
    if !USERNAME_LEN.contains(&username.len())
        || !username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
    {
        return Err(AuthError::Validation(
            "Username must be 3-64 characters of letters, digits, '.', '_' or '-'".to_string(),
        ));
    }
    Ok(username.to_string())
}
