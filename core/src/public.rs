//! Redacted, unauthenticated view of a ticket.

use crate::customer::Customer;
use crate::ticket::{LogEntry, Ticket, recent_logs};
use crate::types::TicketStatus;
use serde::{Deserialize, Serialize};

/// Customer name fields shown publicly. The contact number is never exposed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCustomer {
    /// First name
    pub first_name: String,
    /// Middle name
    pub middle_name: String,
    /// Last name
    pub last_name: String,
    /// Suffix, empty if none
    pub suffix: String,
}

/// Public status page payload. Every field is always present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicView {
    /// Ticket number
    pub ticket_number: String,
    /// Customer name fields
    pub customer: PublicCustomer,
    /// Device description
    pub unit: String,
    /// Reported problem
    pub problem: String,
    /// Current status
    pub status: TicketStatus,
    /// Image references
    pub images: Vec<String>,
    /// Most recent log entries, oldest first
    pub logs: Vec<LogEntry>,
    /// RFC 3339 creation time
    pub created_at: String,
    /// QR artifact URL, empty if none
    pub qr_code_url: String,
}

impl PublicView {
    /// Project a ticket (and its customer, if found) onto the public view.
    #[must_use]
    pub fn project(ticket: &Ticket, customer: Option<&Customer>) -> Self {
        let customer = customer
            .map(|c| PublicCustomer {
                first_name: c.first_name.clone(),
                middle_name: c.middle_name.clone(),
                last_name: c.last_name.clone(),
                suffix: c.suffix.clone().unwrap_or_default(),
            })
            .unwrap_or_default();

        Self {
            ticket_number: ticket.ticket_number.to_string(),
            customer,
            unit: ticket.unit.clone(),
            problem: ticket.problem.clone(),
            status: ticket.status,
            images: ticket.images.clone(),
            logs: recent_logs(&ticket.logs).to_vec(),
            created_at: ticket.created_at.to_rfc3339(),
            qr_code_url: ticket.qr_code_url.clone().unwrap_or_default(),
        }
    }
}
