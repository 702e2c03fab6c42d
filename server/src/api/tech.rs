//! Technician account endpoints.
//!
//! - POST /api/tech/signup - Register (`tech` by default, or `staff`)
//! - POST /api/tech/login - Exchange credentials for a bearer token
//! - POST /api/tech/logout - Revoke the presented token

use axum::{extract::State, http::StatusCode, Json};
use repair_desk_auth::{AuthService, IssuedToken, TechnicianProfile};
use repair_desk_core::Role;
use repair_desk_web::{ApiJson, BearerToken, WebResult};
use serde::Deserialize;

/// Signup body.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    /// Login name
    pub username: String,
    /// Plain-text password, hashed before storage
    pub password: String,
    /// `tech` (default) or `staff`
    pub role: Option<String>,
}

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login name
    pub username: String,
    /// Password
    pub password: String,
}

/// Register a technician.
///
/// # Errors
///
/// 400 for an invalid username, weak password or the `admin` role, 409 if
/// the username is taken.
pub async fn signup(
    State(auth): State<AuthService>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> WebResult<(StatusCode, Json<TechnicianProfile>)> {
    let role = body.role.as_deref().map(str::parse::<Role>).transpose()?;
    let profile = auth.signup(&body.username, &body.password, role).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Log in.
///
/// ```text
/// POST /api/tech/login {"username":"maria","password":"..."}
/// {"token":"...","expiresAt":"2025-01-01T08:00:00Z","role":"tech"}
/// ```
///
/// # Errors
///
/// 401 for unknown users and wrong passwords alike.
pub async fn login(
    State(auth): State<AuthService>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> WebResult<Json<IssuedToken>> {
    Ok(Json(auth.login(&body.username, &body.password).await?))
}

/// Revoke the bearer token. Unknown tokens are ignored.
///
/// # Errors
///
/// 401 without an `Authorization` header.
pub async fn logout(
    State(auth): State<AuthService>,
    BearerToken(token): BearerToken,
) -> WebResult<StatusCode> {
    auth.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
