//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id (set by
//!   [`crate::middleware::correlation_id_layer`], or read from the header)
//! - [`BearerToken`]: the raw token from `Authorization: Bearer <token>`
//! - [`ApiJson`]: `Json` whose rejections are [`AppError`]s
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     ApiJson(body): ApiJson<LoginRequest>,
//! ) -> Result<Json<IssuedToken>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, "Login");
//!     ...
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use repair_desk_auth::AuthError;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Prefers the id stored by the correlation middleware, then a valid
/// `X-Correlation-ID` header, then a fresh UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }
        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Bearer token extracted from the `Authorization` header.
///
/// A missing header is `401`; any other scheme or an empty token is `403`.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Err(AuthError::MissingCredentials.into());
        };
        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::InvalidToken)?;

        Ok(Self(token.to_string()))
    }
}

/// JSON body extractor that rejects with a `400` [`AppError`].
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn parts(header: Option<(&str, &str)>) -> Parts {
        let mut builder = Request::builder();
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(()).expect("Valid request").into_parts().0
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let mut parts = parts(Some((CORRELATION_ID_HEADER, &uuid.to_string())));
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");
        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let mut parts = parts(Some((CORRELATION_ID_HEADER, &Uuid::new_v4().to_string())));
        parts.extensions.insert(CorrelationId(stored));
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");
        assert_eq!(correlation_id.0, stored);
    }

    #[tokio::test]
    async fn test_correlation_id_generates_new() {
        let mut parts = parts(None);
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");
        assert_ne!(correlation_id.0, Uuid::nil());
    }

    #[tokio::test]
    async fn test_bearer_token_extracted() {
        let mut parts = parts(Some(("Authorization", "Bearer abc123")));
        let token = BearerToken::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(token.0, "abc123");
    }

    #[tokio::test]
    async fn test_missing_authorization_is_unauthorized() {
        let mut parts = parts(None);
        let err = BearerToken::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_scheme_is_forbidden() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer ", "token-without-scheme"] {
            let mut parts = parts(Some(("Authorization", value)));
            let err = BearerToken::from_request_parts(&mut parts, &())
                .await
                .unwrap_err();
            assert_eq!(err.status(), StatusCode::FORBIDDEN, "{value}");
        }
    }
}
