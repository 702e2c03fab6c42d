//! Error taxonomy for the ticket core.
//!
//! Two layers:
//!
//! - [`StoreError`]: what a persistence backend can report. Backends map
//!   their native failures (unique violations, connection errors) onto it.
//! - [`TicketError`]: what callers of the directory, numbering and lifecycle
//!   components see. The web layer maps each variant to one HTTP status.

use crate::qr::QrError;
use thiserror::Error;

/// Result type alias for ticket core operations.
pub type Result<T> = std::result::Result<T, TicketError>;

/// Errors reported by store implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("{entity} {key} not found")]
    NotFound {
        /// Kind of record (`ticket`, `customer`, `log entry`, ...)
        entity: &'static str,
        /// Lookup key
        key: String,
    },

    /// A unique constraint rejected the write.
    #[error("duplicate {entity}: {key}")]
    Duplicate {
        /// Kind of record
        entity: &'static str,
        /// The conflicting key value
        key: String,
    },

    /// The backend could not be reached or the statement failed.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Shorthand for a missing ticket.
    #[must_use]
    pub fn ticket_not_found(ticket_number: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "ticket",
            key: ticket_number.into(),
        }
    }

    /// Returns `true` if this error is a unique-constraint violation.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Errors surfaced by the ticket core to its callers.
#[derive(Error, Debug)]
pub enum TicketError {
    /// Ticket type outside `Free Checkup` / `Repair`.
    #[error("Invalid ticketType '{0}'. Allowed: Free Checkup, Repair")]
    InvalidTicketType(String),

    /// Status outside the four lifecycle states.
    #[error("Invalid status '{0}'. Allowed: Pending, Ongoing, Completed, Return")]
    InvalidStatus(String),

    /// Any other rejected input (blank names, malformed ids, too many images).
    #[error("{0}")]
    Validation(String),

    /// Unknown ticket, customer or log entry.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record
        entity: &'static str,
        /// Lookup key
        key: String,
    },

    /// Authenticated actor lacks the role for this operation.
    #[error("Role '{role}' is not allowed to {action}")]
    Forbidden {
        /// The actor's role
        role: String,
        /// What was attempted
        action: &'static str,
    },

    /// Write rejected by a uniqueness rule (e.g. contact number in use).
    #[error("{0}")]
    Conflict(String),

    /// Ticket number retries exceeded.
    #[error("Could not assign a unique ticket number after {attempts} attempts")]
    GenerationExhausted {
        /// Number of attempts made
        attempts: u32,
    },

    /// External collaborator (QR publisher, image store) failed.
    #[error("{service} failed: {message}")]
    Upstream {
        /// Collaborator name
        service: &'static str,
        /// Failure description
        message: String,
    },

    /// Storage failure.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A multi-record update partially applied and could not be reverted.
    #[error("Inconsistent update: {0}")]
    Inconsistent(String),
}

impl TicketError {
    /// Shorthand for a missing ticket.
    #[must_use]
    pub fn ticket_not_found(ticket_number: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Ticket",
            key: ticket_number.into(),
        }
    }

    /// Returns `true` if this error was caused by caller input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use repair_desk_core::TicketError;
    /// assert!(TicketError::InvalidStatus("Done".into()).is_client_error());
    /// assert!(!TicketError::Persistence("down".into()).is_client_error());
    /// ```
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTicketType(_)
                | Self::InvalidStatus(_)
                | Self::Validation(_)
                | Self::NotFound { .. }
                | Self::Forbidden { .. }
                | Self::Conflict(_)
        )
    }
}

impl From<StoreError> for TicketError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => Self::NotFound {
                entity: display_entity(entity),
                key,
            },
            StoreError::Duplicate { entity, key } => {
                Self::Conflict(format!("{entity} '{key}' already exists"))
            }
            StoreError::Unavailable(msg) | StoreError::Corrupt(msg) => Self::Persistence(msg),
        }
    }
}

impl From<QrError> for TicketError {
    fn from(err: QrError) -> Self {
        Self::Upstream {
            service: "QR publisher",
            message: err.to_string(),
        }
    }
}

fn display_entity(entity: &'static str) -> &'static str {
    match entity {
        "ticket" => "Ticket",
        "customer" => "Customer",
        "log entry" => "Log entry",
        "technician" => "Technician",
        _ => entity,
    }
}
