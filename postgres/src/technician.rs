//! `PostgreSQL` technician accounts and sessions.

use crate::is_unique_violation;
use chrono::{DateTime, Utc};
use repair_desk_auth::{
    AuthError, AuthFuture, Session, SessionStore, Technician, TechnicianId, TechnicianRepository,
};
use repair_desk_core::Role;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

fn database(context: &'static str) -> impl FnOnce(sqlx::Error) -> AuthError {
    move |e| AuthError::Database(format!("{context}: {e}"))
}

fn decode_role(raw: &str) -> Result<Role, AuthError> {
    raw.parse()
        .map_err(|_| AuthError::Database(format!("unknown stored role '{raw}'")))
}

fn technician_from_row(row: &PgRow) -> Result<Technician, AuthError> {
    let role: String = row.try_get("role").map_err(database("decode technician"))?;
    Ok(Technician {
        id: TechnicianId(row.try_get("id").map_err(database("decode technician"))?),
        username: row.try_get("username").map_err(database("decode technician"))?,
        password_hash: row
            .try_get("password_hash")
            .map_err(database("decode technician"))?,
        role: decode_role(&role)?,
        created_at: row.try_get("created_at").map_err(database("decode technician"))?,
    })
}

fn session_from_row(row: &PgRow) -> Result<Session, AuthError> {
    let role: String = row.try_get("role").map_err(database("decode session"))?;
    Ok(Session {
        token_digest: row.try_get("token_digest").map_err(database("decode session"))?,
        technician_id: TechnicianId(
            row.try_get("technician_id")
                .map_err(database("decode session"))?,
        ),
        username: row.try_get("username").map_err(database("decode session"))?,
        role: decode_role(&role)?,
        issued_at: row.try_get("issued_at").map_err(database("decode session"))?,
        expires_at: row.try_get("expires_at").map_err(database("decode session"))?,
    })
}

/// Technician accounts, unique on `username`.
#[derive(Clone)]
pub struct PgTechnicianRepository {
    pool: PgPool,
}

impl PgTechnicianRepository {
    /// Create a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl TechnicianRepository for PgTechnicianRepository {
    fn find_by_username(&self, username: String) -> AuthFuture<'_, Option<Technician>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, username, password_hash, role, created_at FROM technicians WHERE username = $1",
            )
            .bind(&username)
            .fetch_optional(&self.pool)
            .await
            .map_err(database("find technician"))?;
            row.as_ref().map(technician_from_row).transpose()
        })
    }

    fn create(&self, technician: Technician) -> AuthFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO technicians (id, username, password_hash, role, created_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(technician.id.0)
            .bind(&technician.username)
            .bind(&technician.password_hash)
            .bind(technician.role.as_str())
            .bind(technician.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AuthError::UsernameTaken(technician.username.clone())
                } else {
                    database("create technician")(e)
                }
            })?;
            tracing::info!(username = %technician.username, role = %technician.role.as_str(), "Technician created");
            Ok(())
        })
    }
}

/// Bearer-token sessions keyed by token digest.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete every session that expired before `now`. Returns how many.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Database`] if the delete fails.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM technician_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(database("purge sessions"))?;
        Ok(result.rows_affected())
    }
}

impl SessionStore for PgSessionStore {
    fn create(&self, session: Session) -> AuthFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO technician_sessions
                 (token_digest, technician_id, username, role, issued_at, expires_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&session.token_digest)
            .bind(session.technician_id.0)
            .bind(&session.username)
            .bind(session.role.as_str())
            .bind(session.issued_at)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(database("create session"))?;
            Ok(())
        })
    }

    fn find(&self, token_digest: String) -> AuthFuture<'_, Option<Session>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT token_digest, technician_id, username, role, issued_at, expires_at
                 FROM technician_sessions WHERE token_digest = $1",
            )
            .bind(&token_digest)
            .fetch_optional(&self.pool)
            .await
            .map_err(database("find session"))?;
            row.as_ref().map(session_from_row).transpose()
        })
    }

    fn delete(&self, token_digest: String) -> AuthFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("DELETE FROM technician_sessions WHERE token_digest = $1")
                .bind(&token_digest)
                .execute(&self.pool)
                .await
                .map_err(database("delete session"))?;
            Ok(())
        })
    }
}
