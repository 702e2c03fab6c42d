//! Unauthenticated ticket lookup for the status page.
//!
//! - GET /api/public/:ticketNumber
//! - GET /api/tickets/public/:ticketNumber (alias)

use axum::{
    extract::{Path, State},
    Json,
};
use repair_desk_core::{PublicView, TicketLifecycle, TicketNumber};
use repair_desk_web::WebResult;

/// Redacted view: customer first and last name only, newest logs.
///
/// # Errors
///
/// 404 for an unknown ticket number.
pub async fn public_ticket(
    State(desk): State<TicketLifecycle>,
    Path(ticket_number): Path<String>,
) -> WebResult<Json<PublicView>> {
    Ok(Json(
        desk.public_view(&TicketNumber::new(ticket_number.trim()))
            .await?,
    ))
}
