//! Technician accounts and sessions.

use chrono::{DateTime, Utc};
use repair_desk_core::{Actor, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Technician identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechnicianId(pub Uuid);

impl TechnicianId {
    /// Generate a new technician ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TechnicianId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TechnicianId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A technician account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Technician {
    /// Identifier
    pub id: TechnicianId,
    /// Unique login name
    pub username: String,
    /// bcrypt hash (see [`crate::password`])
    pub password_hash: String,
    /// Authorization role
    pub role: Role,
    /// Signup time
    pub created_at: DateTime<Utc>,
}

/// Public account info returned by signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianProfile {
    /// Identifier
    pub id: TechnicianId,
    /// Login name
    pub username: String,
    /// Role
    pub role: Role,
    /// Signup time
    pub created_at: DateTime<Utc>,
}

impl From<&Technician> for TechnicianProfile {
    fn from(tech: &Technician) -> Self {
        Self {
            id: tech.id,
            username: tech.username.clone(),
            role: tech.role,
            created_at: tech.created_at,
        }
    }
}

/// A login session, keyed by the digest of its bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// SHA-256 hex digest of the bearer token
    pub token_digest: String,
    /// Owning technician
    pub technician_id: TechnicianId,
    /// Username at login time
    pub username: String,
    /// Role at login time
    pub role: Role,
    /// Login time
    pub issued_at: DateTime<Utc>,
    /// Expiry
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The actor this session authenticates.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::new(self.username.clone(), self.role)
    }
}

/// Token handed to the client at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    /// Opaque bearer token
    pub token: String,
    /// When it stops working
    pub expires_at: DateTime<Utc>,
    /// Role of the logged-in technician
    pub role: Role,
}
