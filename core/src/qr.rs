//! QR artifact collaborator.
//!
//! After a ticket is persisted the lifecycle manager asks a [`QrPublisher`]
//! for a scannable artifact that points at the public status page. The
//! publisher is external (an upload service, a rendering link) and may be
//! slow or fail; callers bound it with a timeout and apply a
//! [`QrFailurePolicy`].

use crate::types::TicketNumber;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a QR publisher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QrError {
    /// No answer within the allowed time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with an error status.
    #[error("rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code returned by the service
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Connection, TLS or decoding failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Produces a QR artifact URL for a ticket.
///
/// Dyn-compatible so the server can pick an implementation from
/// configuration at startup.
pub trait QrPublisher: Send + Sync {
    /// Publish a QR code encoding `check_url` and return its URL.
    ///
    /// # Errors
    ///
    /// Returns a [`QrError`] when the artifact could not be produced.
    fn publish(
        &self,
        ticket_number: &TicketNumber,
        check_url: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, QrError>> + Send + '_>>;
}

/// What ticket creation does when QR publishing fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QrFailurePolicy {
    /// Delete the freshly created ticket and fail the request.
    #[default]
    Rollback,
    /// Keep the ticket without a QR URL and report the failure alongside it.
    KeepWithoutQr,
}

impl std::str::FromStr for QrFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rollback" => Ok(Self::Rollback),
            "keep" | "keep_without_qr" => Ok(Self::KeepWithoutQr),
            other => Err(format!("unknown QR failure policy '{other}'")),
        }
    }
}

/// Public status-check URL encoded into the QR artifact.
///
/// # Examples
///
/// ```
/// # use repair_desk_core::{qr::check_url, TicketNumber};
/// let url = check_url("https://shop.example/status", &TicketNumber::new("TKT-20250101-300-AB12"));
/// assert_eq!(url, "https://shop.example/status?ticket=TKT-20250101-300-AB12");
/// ```
#[must_use]
pub fn check_url(status_page_url: &str, ticket_number: &TicketNumber) -> String {
    let separator = if status_page_url.contains('?') { '&' } else { '?' };
    format!("{status_page_url}{separator}ticket={ticket_number}")
}
