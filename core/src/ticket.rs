//! Ticket records, log entries and the display view.

use crate::customer::Customer;
use crate::types::{CustomerId, LogId, TicketNumber, TicketStatus, TicketType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored when the unit is missing or blank.
pub const UNKNOWN_UNIT: &str = "Unknown Unit";

/// Stored when the problem is missing or blank.
pub const UNSPECIFIED_PROBLEM: &str = "Not specified";

/// Number of log entries returned by every read.
pub const DISPLAY_LOG_LIMIT: usize = 10;

/// Maximum images attached at creation.
pub const MAX_IMAGES: usize = 5;

/// Maximum characters in one log entry.
pub const MAX_LOG_LEN: usize = 2000;

/// One entry in a ticket's journal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Entry identity, used for deletion
    #[serde(rename = "_id")]
    pub id: LogId,
    /// Entry text
    pub text: String,
    /// When the entry was appended
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    /// New entry with a fresh id.
    #[must_use]
    pub fn new(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: LogId::new(),
            text: text.into(),
            created_at,
        }
    }
}

/// A ticket as held by the store, with its full log history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Unique, immutable number
    pub ticket_number: TicketNumber,
    /// Kind of service
    pub ticket_type: TicketType,
    /// Owning customer
    pub customer_id: CustomerId,
    /// Device description
    pub unit: String,
    /// Reported problem
    pub problem: String,
    /// Current lifecycle state
    pub status: TicketStatus,
    /// Image references, in upload order
    pub images: Vec<String>,
    /// Complete journal, oldest first
    pub logs: Vec<LogEntry>,
    /// QR artifact, once published
    pub qr_code_url: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// What a technician sees: the ticket, its customer and recent logs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetails {
    /// Unique number
    pub ticket_number: TicketNumber,
    /// Kind of service
    pub ticket_type: TicketType,
    /// Linked customer, `None` if the record has gone missing
    pub customer: Option<Customer>,
    /// Device description
    pub unit: String,
    /// Reported problem
    pub problem: String,
    /// Current state
    pub status: TicketStatus,
    /// Image references
    pub images: Vec<String>,
    /// The most recent entries, oldest first
    pub logs: Vec<LogEntry>,
    /// QR artifact URL
    pub qr_code_url: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl TicketDetails {
    /// Join a ticket with its customer and truncate logs for display.
    #[must_use]
    pub fn new(ticket: Ticket, customer: Option<Customer>) -> Self {
        let logs = recent_logs(&ticket.logs).to_vec();
        Self {
            ticket_number: ticket.ticket_number,
            ticket_type: ticket.ticket_type,
            customer,
            unit: ticket.unit,
            problem: ticket.problem,
            status: ticket.status,
            images: ticket.images,
            logs,
            qr_code_url: ticket.qr_code_url,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

/// The last [`DISPLAY_LOG_LIMIT`] entries, in chronological order.
#[must_use]
pub fn recent_logs(logs: &[LogEntry]) -> &[LogEntry] {
    &logs[logs.len().saturating_sub(DISPLAY_LOG_LIMIT)..]
}

/// Trimmed unit, or [`UNKNOWN_UNIT`] when blank.
#[must_use]
pub fn normalize_unit(raw: Option<&str>) -> String {
    or_sentinel(raw, UNKNOWN_UNIT)
}

/// Trimmed problem, or [`UNSPECIFIED_PROBLEM`] when blank.
#[must_use]
pub fn normalize_problem(raw: Option<&str>) -> String {
    or_sentinel(raw, UNSPECIFIED_PROBLEM)
}

fn or_sentinel(raw: Option<&str>, sentinel: &str) -> String {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => sentinel.to_string(),
    }
}
