//! Persistence traits for customers and tickets.
//!
//! The core never talks to a database directly. Every component receives
//! `Arc<dyn CustomerStore>` / `Arc<dyn TicketStore>` and relies on the
//! store for the three atomic primitives the lifecycle needs:
//!
//! - a uniqueness check on insert (contact number, ticket number),
//!   reported as [`StoreError::Duplicate`];
//! - an append of one log entry that never rewrites the existing list;
//! - a status change that sets fields and appends its log line together.
//!
//! # Implementations
//!
//! - `PgCustomerStore` / `PgTicketStore` (in `repair-desk-postgres`): production
//! - `InMemoryCustomerStore` / `InMemoryTicketStore` (in `repair-desk-testing`):
//!   development and tests
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so the
//! traits can be used as `Arc<dyn ...>` inside the lifecycle manager.

use crate::customer::Customer;
use crate::error::StoreError;
use crate::ticket::{LogEntry, Ticket};
use crate::types::{CustomerId, LogId, TicketNumber, TicketStatus};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Customer persistence.
pub trait CustomerStore: Send + Sync {
    /// Look up a customer by exact contact number.
    fn find_by_contact(&self, contact_number: String) -> StoreFuture<'_, Option<Customer>>;

    /// Look up a customer by id.
    fn find_by_id(&self, id: CustomerId) -> StoreFuture<'_, Option<Customer>>;

    /// Fetch several customers at once. Unknown ids are skipped.
    fn find_many(&self, ids: Vec<CustomerId>) -> StoreFuture<'_, Vec<Customer>>;

    /// Insert a new customer.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] if the contact number is already taken.
    fn insert(&self, customer: Customer) -> StoreFuture<'_, ()>;

    /// Replace an existing customer's fields.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown id, [`StoreError::Duplicate`]
    /// if the new contact number belongs to someone else.
    fn update(&self, customer: Customer) -> StoreFuture<'_, ()>;

    /// Cheap liveness probe.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

/// Fields written by a status change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    /// New status
    pub status: TicketStatus,
    /// Unit after the change
    pub unit: String,
    /// Problem after the change
    pub problem: String,
    /// Log line recording the change
    pub log: LogEntry,
    /// Modification time
    pub updated_at: DateTime<Utc>,
}

/// Fields written by a details update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailsChange {
    /// Unit after the change
    pub unit: String,
    /// Problem after the change
    pub problem: String,
    /// Audit line with the before/after diff
    pub log: LogEntry,
    /// Modification time
    pub updated_at: DateTime<Utc>,
}

/// Ticket persistence.
///
/// Mutations that return a [`Ticket`] return it with the full log history;
/// display truncation happens in the lifecycle manager.
pub trait TicketStore: Send + Sync {
    /// Insert a new ticket.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] if the ticket number exists.
    fn insert(&self, ticket: Ticket) -> StoreFuture<'_, ()>;

    /// Load a ticket with its full log history.
    fn find(&self, ticket_number: TicketNumber) -> StoreFuture<'_, Option<Ticket>>;

    /// All tickets, newest first.
    fn list(&self) -> StoreFuture<'_, Vec<Ticket>>;

    /// Tickets with `start <= created_at < end`.
    fn count_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreFuture<'_, u64>;

    /// Set status/unit/problem and append the change's log line atomically.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown ticket.
    fn update_status(
        &self,
        ticket_number: TicketNumber,
        change: StatusChange,
    ) -> StoreFuture<'_, Ticket>;

    /// Push one log entry.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown ticket.
    fn append_log(&self, ticket_number: TicketNumber, entry: LogEntry) -> StoreFuture<'_, Ticket>;

    /// Remove exactly one log entry.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the ticket or the entry does not exist.
    fn remove_log(&self, ticket_number: TicketNumber, log_id: LogId) -> StoreFuture<'_, Ticket>;

    /// Set unit/problem and append the audit line atomically.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown ticket.
    fn update_details(
        &self,
        ticket_number: TicketNumber,
        change: DetailsChange,
    ) -> StoreFuture<'_, Ticket>;

    /// Record the published QR artifact.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown ticket.
    fn set_qr_url(&self, ticket_number: TicketNumber, url: String) -> StoreFuture<'_, Ticket>;

    /// Hard delete, logs included.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown ticket.
    fn delete(&self, ticket_number: TicketNumber) -> StoreFuture<'_, ()>;

    /// Cheap liveness probe.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
