//! Ticket endpoints.
//!
//! - POST /api/tickets - Intake (multipart with image files, or JSON)
//! - GET /api/tickets - List tickets, newest first (requires auth)
//! - GET /api/tickets/:ticketNumber - Internal view (requires auth)
//! - PUT /api/tickets/:ticketNumber/status - Change status (requires auth)
//! - PUT /api/tickets/:ticketNumber/log - Append a log entry (requires auth)
//! - DELETE /api/tickets/:ticketNumber/logs/:logId - Remove a log entry (requires auth)
//! - POST /api/tickets/update/:ticketNumber - Edit customer and device details (requires auth)
//! - DELETE /api/tickets/:ticketNumber - Delete (requires admin or tech)

use crate::context::AppContext;
use crate::uploads::ImageStore;
use axum::{
    extract::{multipart::MultipartError, FromRequest, Multipart, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use repair_desk_core::{
    customer::normalize_contact, ticket::MAX_IMAGES, CustomerUpdate, NewTicket, PersonName,
    TicketCreated, TicketDetails, TicketError, TicketLifecycle, TicketNumber, TicketType,
};
use repair_desk_web::{ApiJson, AppError, Authenticated, CanDeleteTickets, WebResult};
use serde::Deserialize;

// ============================================================================
// Request Types
// ============================================================================

/// Intake form. Multipart requests carry the same names as text fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTicketRequest {
    /// `Free Checkup` or `Repair`
    pub ticket_type: String,
    /// Customer phone number, the customer's identity
    pub contact_number: String,
    /// Customer first name
    pub first_name: String,
    /// Customer middle name
    pub middle_name: String,
    /// Customer last name
    pub last_name: String,
    /// Name suffix (Jr., III)
    pub suffix: Option<String>,
    /// Device description
    pub unit: Option<String>,
    /// Reported problem
    pub problem: Option<String>,
    /// Image references (JSON only; multipart uploads fill this in)
    pub images: Vec<String>,
}

impl CreateTicketRequest {
    fn set_text(&mut self, name: &str, value: String) {
        match name {
            "ticketType" => self.ticket_type = value,
            "contactNumber" => self.contact_number = value,
            "firstName" => self.first_name = value,
            "middleName" => self.middle_name = value,
            "lastName" => self.last_name = value,
            "suffix" => self.suffix = Some(value),
            "unit" => self.unit = Some(value),
            "problem" => self.problem = Some(value),
            other => tracing::debug!(field = other, "Ignoring unknown intake field"),
        }
    }

    fn person_name(&self) -> PersonName {
        let name = PersonName::new(&self.first_name, &self.middle_name, &self.last_name);
        match &self.suffix {
            Some(suffix) => name.with_suffix(suffix),
            None => name,
        }
    }

    fn into_new_ticket(self) -> NewTicket {
        NewTicket {
            name: self.person_name(),
            contact_number: self.contact_number,
            ticket_type: self.ticket_type,
            unit: self.unit,
            problem: self.problem,
            images: self.images,
        }
    }
}

/// Status change.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// `Pending`, `Ongoing`, `Completed` or `Return`
    pub status: String,
    /// Replacement device description
    pub unit: Option<String>,
    /// Replacement problem description
    pub problem: Option<String>,
}

/// Log entry to append.
#[derive(Debug, Deserialize)]
pub struct LogRequest {
    /// Entry text
    pub log: String,
}

/// Customer and device edits. Absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDetailsRequest {
    /// Customer fields
    #[serde(flatten)]
    pub customer: CustomerUpdate,
    /// Device description
    pub unit: Option<String>,
    /// Reported problem
    pub problem: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Open a ticket.
///
/// Accepts `multipart/form-data` (text fields plus up to five `images`
/// files) or a JSON body whose `images` is a list of URLs.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:5000/api/tickets \
///   -F ticketType=Repair -F contactNumber=09175550101 \
///   -F firstName=Juan -F middleName=Santos -F lastName=Cruz \
///   -F unit="ThinkPad T480" -F problem="No power" \
///   -F images=@board.jpg
/// ```
///
/// # Errors
///
/// - 400 for an invalid ticket type, missing names, bad contact number,
///   too many or non-image uploads
/// - 502 if QR publishing failed and the ticket was rolled back
/// - 503 if no unique ticket number could be assigned
pub async fn create_ticket(
    State(ctx): State<AppContext>,
    request: Request,
) -> WebResult<(StatusCode, Json<TicketCreated>)> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let (body, uploaded) = if is_multipart {
        let multipart = Multipart::from_request(request, &ctx)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
        let body = read_multipart(&ctx, multipart).await?;
        let uploaded = body.images.clone();
        (body, uploaded)
    } else {
        let ApiJson(body) = ApiJson::<CreateTicketRequest>::from_request(request, &ctx).await?;
        (body, Vec::new())
    };

    let created = match ctx.lifecycle.open(body.into_new_ticket()).await {
        Ok(created) => created,
        Err(err) => {
            // An inconsistent rollback leaves the ticket, and its images, in place.
            if !matches!(err, TicketError::Inconsistent(_)) {
                discard_uploads(ctx.images.as_ref(), uploaded).await;
            }
            return Err(err.into());
        }
    };
    tracing::info!(
        ticket_number = %created.ticket.ticket_number,
        qr = created.qr_code_url.is_some(),
        "Ticket opened"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// Collect text fields, validate the intake, then store the image files.
async fn read_multipart(
    ctx: &AppContext,
    mut multipart: Multipart,
) -> WebResult<CreateTicketRequest> {
    let mut body = CreateTicketRequest::default();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "images" {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if !bytes.is_empty() {
                files.push((file_name, content_type, bytes.to_vec()));
            }
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            body.set_text(&name, value);
        }
    }

    // Reject before anything touches the disk. `open` repeats these checks.
    body.ticket_type.parse::<TicketType>()?;
    body.person_name().normalized()?;
    normalize_contact(&body.contact_number)?;
    if files.len() > MAX_IMAGES {
        return Err(AppError::bad_request(format!(
            "At most {MAX_IMAGES} images may be attached"
        )));
    }

    for (file_name, content_type, bytes) in files {
        match ctx.images.store(file_name, content_type, bytes).await {
            Ok(reference) => body.images.push(reference),
            Err(err) => {
                discard_uploads(ctx.images.as_ref(), std::mem::take(&mut body.images)).await;
                return Err(err.into());
            }
        }
    }
    Ok(body)
}

/// Best-effort removal of images stored for an intake that failed.
async fn discard_uploads(images: &dyn ImageStore, references: Vec<String>) {
    for reference in references {
        if let Err(err) = images.remove(reference.clone()).await {
            tracing::warn!(reference = %reference, error = %err, "Failed to remove orphaned upload");
        }
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::payload_too_large(err.body_text())
    } else {
        AppError::bad_request(err.body_text())
    }
}

/// List all tickets, newest first, with truncated logs.
///
/// # Errors
///
/// 401/403 without a valid token.
pub async fn list_tickets(
    _: Authenticated,
    State(desk): State<TicketLifecycle>,
) -> WebResult<Json<Vec<TicketDetails>>> {
    Ok(Json(desk.list().await?))
}

/// Internal view of one ticket.
///
/// # Errors
///
/// 404 for an unknown ticket number.
pub async fn get_ticket(
    _: Authenticated,
    State(desk): State<TicketLifecycle>,
    Path(ticket_number): Path<String>,
) -> WebResult<Json<TicketDetails>> {
    Ok(Json(desk.get(&TicketNumber::new(ticket_number)).await?))
}

/// Change status, optionally correcting unit and problem.
///
/// # Errors
///
/// 400 for an unknown status, 404 for an unknown ticket.
pub async fn update_status(
    Authenticated(actor): Authenticated,
    State(desk): State<TicketLifecycle>,
    Path(ticket_number): Path<String>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> WebResult<Json<TicketDetails>> {
    let details = desk
        .update_status(
            &TicketNumber::new(ticket_number),
            &body.status,
            body.unit.as_deref(),
            body.problem.as_deref(),
            &actor,
        )
        .await?;
    Ok(Json(details))
}

/// Append a log entry.
///
/// # Errors
///
/// 400 for empty text, 404 for an unknown ticket.
pub async fn append_log(
    _: Authenticated,
    State(desk): State<TicketLifecycle>,
    Path(ticket_number): Path<String>,
    ApiJson(body): ApiJson<LogRequest>,
) -> WebResult<Json<TicketDetails>> {
    Ok(Json(
        desk.append_log(&TicketNumber::new(ticket_number), &body.log)
            .await?,
    ))
}

/// Remove one log entry.
///
/// # Errors
///
/// 400 for a malformed log id, 404 for an unknown ticket or entry.
pub async fn delete_log(
    _: Authenticated,
    State(desk): State<TicketLifecycle>,
    Path((ticket_number, log_id)): Path<(String, String)>,
) -> WebResult<Json<TicketDetails>> {
    Ok(Json(
        desk.delete_log(&TicketNumber::new(ticket_number), &log_id)
            .await?,
    ))
}

/// Edit customer and device details; the change is logged as a diff.
///
/// # Errors
///
/// 400 for blank names, 404 for an unknown ticket, 409 if the new contact
/// number belongs to another customer.
pub async fn update_details(
    _: Authenticated,
    State(desk): State<TicketLifecycle>,
    Path(ticket_number): Path<String>,
    ApiJson(body): ApiJson<UpdateDetailsRequest>,
) -> WebResult<Json<TicketDetails>> {
    let details = desk
        .update_details(
            &TicketNumber::new(ticket_number),
            &body.customer,
            body.unit.as_deref(),
            body.problem.as_deref(),
        )
        .await?;
    Ok(Json(details))
}

/// Delete a ticket and its logs.
///
/// # Errors
///
/// 403 for the `staff` role, 404 for an unknown ticket.
pub async fn delete_ticket(
    CanDeleteTickets(actor): CanDeleteTickets,
    State(desk): State<TicketLifecycle>,
    Path(ticket_number): Path<String>,
) -> WebResult<StatusCode> {
    desk.delete(&TicketNumber::new(ticket_number), &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
