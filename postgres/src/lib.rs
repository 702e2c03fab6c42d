//! `PostgreSQL` storage for Repair Desk.
//!
//! Implements the core's [`CustomerStore`](repair_desk_core::CustomerStore)
//! and [`TicketStore`](repair_desk_core::TicketStore) and the auth crate's
//! [`TechnicianRepository`](repair_desk_auth::TechnicianRepository) and
//! [`SessionStore`](repair_desk_auth::SessionStore) on top of a shared
//! `sqlx` pool.
//!
//! - Contact numbers, ticket numbers and usernames are unique indexes;
//!   violations surface as `Duplicate` / `UsernameTaken`.
//! - Log entries are rows in `ticket_logs`, ordered by a `BIGSERIAL`; an
//!   append is a single insert and never rewrites earlier entries.
//! - Status changes update the ticket and insert the log row in one
//!   transaction.
//!
//! # Example
//!
//! ```ignore
//! use repair_desk_postgres::{PoolConfig, connect, migrate, PgTicketStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect(&PoolConfig::new("postgres://localhost/repair_desk")).await?;
//!     migrate(&pool).await?;
//!     let tickets = PgTicketStore::new(pool.clone());
//!     Ok(())
//! }
//! ```

mod customer;
mod technician;
mod ticket;

pub use customer::PgCustomerStore;
pub use technician::{PgSessionStore, PgTechnicianRepository};
pub use ticket::PgTicketStore;

use repair_desk_core::StoreError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// `postgres://` connection string
    pub url: String,
    /// Maximum pool size
    pub max_connections: u32,
    /// Connections kept open when idle
    pub min_connections: u32,
    /// How long to wait for a connection
    pub connect_timeout: Duration,
}

impl PoolConfig {
    /// Defaults for everything but the URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Errors while setting up the database.
#[derive(Error, Debug)]
pub enum SetupError {
    /// Could not connect.
    #[error("Failed to connect to PostgreSQL: {0}")]
    Connect(#[from] sqlx::Error),

    /// Migrations failed.
    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`SetupError::Connect`] if the database is unreachable.
pub async fn connect(config: &PoolConfig) -> Result<PgPool, SetupError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .connect(&config.url)
        .await?;
    tracing::info!(
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Apply the embedded migrations.
///
/// # Errors
///
/// Returns [`SetupError::Migrate`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), SetupError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn unavailable(context: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::Unavailable(format!("{context}: {e}"))
}
