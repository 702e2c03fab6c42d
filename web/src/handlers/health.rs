//! Health check endpoints.
//!
//! `/health` is a liveness probe that touches nothing; `/ready` pings the
//! ticket store through the lifecycle manager.

use axum::{extract::State, http::StatusCode, Json};
use repair_desk_core::TicketLifecycle;
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Liveness check.
///
/// ```text
/// GET /health
/// {"status":"ok","version":"0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness
    pub ready: bool,
    /// Store connectivity
    pub database: bool,
}

/// Readiness check: `200` when the store answers a ping, `503` otherwise.
pub async fn readiness_check(
    State(desk): State<TicketLifecycle>,
) -> (StatusCode, Json<ReadinessResponse>) {
    match desk.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                database: true,
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    ready: false,
                    database: false,
                }),
            )
        }
    }
}
