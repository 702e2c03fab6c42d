//! Authentication extractors.
//!
//! Handlers that need a technician take [`Authenticated`]; the delete
//! endpoint takes [`CanDeleteTickets`]. Both resolve the bearer token
//! through the [`AuthService`] found in the router state.
//!
//! ```rust,ignore
//! async fn update_status(
//!     Authenticated(actor): Authenticated,
//!     State(desk): State<TicketLifecycle>,
//!     ...
//! ) -> Result<Json<TicketDetails>, AppError> { ... }
//! ```

use crate::error::AppError;
use crate::extractors::BearerToken;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use repair_desk_auth::AuthService;
use repair_desk_core::Actor;

/// A technician authenticated by bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let auth = AuthService::from_ref(state);
        let actor = auth.authenticate(&token).await.map_err(|err| {
            tracing::debug!(error = %err, "Bearer token rejected");
            AppError::from(err)
        })?;
        Ok(Self(actor))
    }
}

/// An authenticated technician whose role may delete tickets
/// (`admin` or `tech`).
#[derive(Debug, Clone)]
pub struct CanDeleteTickets(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for CanDeleteTickets
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Authenticated(actor) = Authenticated::from_request_parts(parts, state).await?;
        if !actor.role.can_delete_tickets() {
            tracing::warn!(username = %actor.username, role = actor.role.as_str(), "Delete refused");
            return Err(AppError::forbidden(format!(
                "Role '{}' is not allowed to delete tickets",
                actor.role.as_str()
            )));
        }
        Ok(Self(actor))
    }
}
