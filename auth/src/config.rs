//! Authentication configuration.
//!
//! Values are provided by the application (see the server's `Config`), not
//! hardcoded.

use crate::password::DEFAULT_COST;
use chrono::Duration;

/// Auth service configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// How long a login session lasts.
    ///
    /// Default: 8 hours
    pub session_ttl: Duration,

    /// bcrypt work factor (4..=31).
    ///
    /// Default: 12
    pub hash_cost: u32,
}

impl AuthConfig {
    /// Set session duration.
    #[must_use]
    pub const fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set the bcrypt work factor.
    #[must_use]
    pub const fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(8),
            hash_cost: DEFAULT_COST,
        }
    }
}
