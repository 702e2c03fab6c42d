//! Router configuration for Repair Desk.
//!
//! Builds the complete Axum router with all endpoints and the response
//! layers every request passes through.

use crate::api::{public, tech, tickets};
use crate::context::AppContext;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use repair_desk_web::correlation_id_layer;
use repair_desk_web::handlers::health::{health_check, readiness_check};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

/// Build the complete Axum router.
///
/// - Health, readiness and metrics at the root
/// - Ticket and technician endpoints under `/api`
/// - Uploaded images under `/uploads`
/// - Everything else from the public directory
pub fn build_router(ctx: AppContext) -> Router {
    let api_routes = Router::new()
        // Tickets
        .route(
            "/tickets",
            post(tickets::create_ticket).get(tickets::list_tickets),
        )
        .route("/tickets/public/:ticket_number", get(public::public_ticket))
        .route("/tickets/update/:ticket_number", post(tickets::update_details))
        .route(
            "/tickets/:ticket_number",
            get(tickets::get_ticket).delete(tickets::delete_ticket),
        )
        .route("/tickets/:ticket_number/status", put(tickets::update_status))
        .route("/tickets/:ticket_number/log", put(tickets::append_log))
        .route(
            "/tickets/:ticket_number/logs/:log_id",
            delete(tickets::delete_log),
        )
        // Status page
        .route("/public/:ticket_number", get(public::public_ticket))
        // Technicians
        .route("/tech/signup", post(tech::signup))
        .route("/tech/login", post(tech::login))
        .route("/tech/logout", post(tech::logout));

    let uploads = ServeDir::new(&ctx.http.upload_dir);
    let public_dir = ServeDir::new(&ctx.http.public_dir);
    let body_limit = ctx.http.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .nest("/api", api_routes)
        .nest_service("/uploads", uploads)
        .fallback_service(public_dir)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(ctx)
}

/// Prometheus text exposition, 404 when metrics are disabled.
#[allow(clippy::unused_async)]
async fn metrics(State(ctx): State<AppContext>) -> Response {
    match &ctx.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
