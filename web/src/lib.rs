//! Axum integration for Repair Desk.
//!
//! The shell around the ticket core: it turns HTTP requests into calls on
//! [`repair_desk_core::TicketLifecycle`] and [`repair_desk_auth::AuthService`]
//! and their errors back into JSON responses.
//!
//! # Request Flow
//!
//! 1. **Correlate**: [`correlation_id_layer`] tags the request and its span
//! 2. **Authenticate**: [`Authenticated`] / [`CanDeleteTickets`] resolve the
//!    bearer token into an [`repair_desk_core::Actor`]
//! 3. **Extract** the body with [`ApiJson`]
//! 4. **Call** the lifecycle manager
//! 5. **Map** the result, or the [`AppError`], to a response
//!
//! # Example
//!
//! ```ignore
//! use repair_desk_web::{AppError, ApiJson, Authenticated};
//!
//! async fn append_log(
//!     Authenticated(actor): Authenticated,
//!     State(desk): State<TicketLifecycle>,
//!     Path(number): Path<String>,
//!     ApiJson(body): ApiJson<LogRequest>,
//! ) -> Result<Json<TicketDetails>, AppError> {
//!     Ok(Json(desk.append_log(&TicketNumber::new(number), &body.log).await?))
//! }
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use auth::{Authenticated, CanDeleteTickets};
pub use error::AppError;
pub use extractors::{ApiJson, BearerToken, CorrelationId};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
