//! Error types for web handlers.
//!
//! [`AppError`] is the single error type handlers return. Domain errors from
//! the ticket core and the auth service convert into it with `?`, each
//! variant landing on one HTTP status. The response body is always
//! `{"error": "<message>", "code": "<CODE>"}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use repair_desk_auth::AuthError;
use repair_desk_core::TicketError;
use serde::Serialize;
use std::fmt;

/// Message sent to clients in place of internal failure details.
const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(desk): State<TicketLifecycle>) -> Result<Json<TicketDetails>, AppError> {
///     let ticket = desk.get(&number).await?;
///     Ok(Json(ticket))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, "UNAUTHORIZED")
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message, "FORBIDDEN")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND")
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message, "CONFLICT")
    }

    /// Create a 413 Payload Too Large error.
    #[must_use]
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message, "PAYLOAD_TOO_LARGE")
    }

    /// Create a 500 Internal Server Error. The message is replaced by a
    /// generic one in the response and only logged.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message,
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// Create a 502 Bad Gateway error.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message, "UPSTREAM_ERROR")
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "SERVICE_UNAVAILABLE")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    /// Human-readable error message.
    error: &'a str,
    /// Error code (for client error handling).
    code: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.status == StatusCode::INTERNAL_SERVER_ERROR {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Internal server error"
                ),
            }
            INTERNAL_MESSAGE
        } else {
            if self.status.is_server_error() {
                tracing::error!(status = %self.status, code = self.code, message = %self.message, "Request failed");
            }
            self.message.as_str()
        };

        let body = ErrorResponse {
            error: message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<TicketError> for AppError {
    fn from(err: TicketError) -> Self {
        let message = err.to_string();
        match err {
            TicketError::InvalidTicketType(_) => {
                Self::new(StatusCode::BAD_REQUEST, message, "INVALID_TICKET_TYPE")
            }
            TicketError::InvalidStatus(_) => {
                Self::new(StatusCode::BAD_REQUEST, message, "INVALID_STATUS")
            }
            TicketError::Validation(_) => {
                Self::new(StatusCode::BAD_REQUEST, message, "VALIDATION_ERROR")
            }
            TicketError::NotFound { .. } => Self::not_found(message),
            TicketError::Forbidden { .. } => Self::forbidden(message),
            TicketError::Conflict(_) => Self::conflict(message),
            TicketError::GenerationExhausted { .. } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                message,
                "GENERATION_EXHAUSTED",
            ),
            TicketError::Upstream { .. } => Self::bad_gateway(message),
            TicketError::Persistence(_) | TicketError::Inconsistent(_) => {
                Self::internal(message.clone()).with_source(anyhow::Error::new(err))
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::MissingCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, message, "MISSING_CREDENTIALS")
            }
            AuthError::InvalidCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, message, "INVALID_CREDENTIALS")
            }
            AuthError::InvalidToken => Self::new(StatusCode::FORBIDDEN, message, "INVALID_TOKEN"),
            AuthError::SessionExpired => {
                Self::new(StatusCode::FORBIDDEN, message, "SESSION_EXPIRED")
            }
            AuthError::UsernameTaken(_) => Self::new(StatusCode::CONFLICT, message, "USERNAME_TAKEN"),
            AuthError::Validation(_) => {
                Self::new(StatusCode::BAD_REQUEST, message, "VALIDATION_ERROR")
            }
            AuthError::Database(_) | AuthError::Internal(_) => {
                Self::internal(message.clone()).with_source(anyhow::Error::new(err))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(INTERNAL_MESSAGE).with_source(err)
    }
}
