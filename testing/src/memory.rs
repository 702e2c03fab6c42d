//! In-memory store implementations.
//!
//! Backed by `Arc<Mutex<HashMap>>`. Every mutation happens under one lock,
//! so inserts are check-and-set and log appends are true pushes; this gives
//! the same atomicity the `PostgreSQL` stores get from unique indexes and
//! single-row inserts. Used by tests and by the server's `memory` backend.
//!
//! Both stores expose failure switches so tests can exercise error paths.

use repair_desk_core::store::{CustomerStore, DetailsChange, StatusChange, StoreFuture, TicketStore};
use repair_desk_core::{Customer, CustomerId, LogEntry, LogId, StoreError, Ticket, TicketNumber};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

fn offline() -> StoreError {
    StoreError::Unavailable("in-memory store marked unavailable".to_string())
}

// ============================================================================
// Customers
// ============================================================================

#[derive(Debug, Default)]
struct CustomerTable {
    by_id: HashMap<CustomerId, Customer>,
    by_contact: HashMap<String, CustomerId>,
}

/// In-memory [`CustomerStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerStore {
    table: Arc<Mutex<CustomerTable>>,
    offline: Arc<AtomicBool>,
    updates_left: Arc<Mutex<Option<usize>>>,
}

impl InMemoryCustomerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored customers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.by_id.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct read, bypassing the trait.
    #[must_use]
    pub fn get(&self, id: CustomerId) -> Option<Customer> {
        self.table.lock().ok()?.by_id.get(&id).cloned()
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Allow `n` more successful updates, then fail every update.
    /// `None` removes the limit.
    pub fn limit_updates(&self, n: Option<usize>) {
        if let Ok(mut left) = self.updates_left.lock() {
            *left = n;
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(offline())
        } else {
            Ok(())
        }
    }
}

impl CustomerStore for InMemoryCustomerStore {
    fn find_by_contact(&self, contact_number: String) -> StoreFuture<'_, Option<Customer>> {
        Box::pin(async move {
            self.check()?;
            let table = self.table.lock().map_err(|_| poisoned())?;
            Ok(table
                .by_contact
                .get(&contact_number)
                .and_then(|id| table.by_id.get(id))
                .cloned())
        })
    }

    fn find_by_id(&self, id: CustomerId) -> StoreFuture<'_, Option<Customer>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.table.lock().map_err(|_| poisoned())?.by_id.get(&id).cloned())
        })
    }

    fn find_many(&self, ids: Vec<CustomerId>) -> StoreFuture<'_, Vec<Customer>> {
        Box::pin(async move {
            self.check()?;
            let table = self.table.lock().map_err(|_| poisoned())?;
            Ok(ids.iter().filter_map(|id| table.by_id.get(id).cloned()).collect())
        })
    }

    fn insert(&self, customer: Customer) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check()?;
            let mut table = self.table.lock().map_err(|_| poisoned())?;
            if table.by_contact.contains_key(&customer.contact_number) {
                return Err(StoreError::Duplicate {
                    entity: "customer",
                    key: customer.contact_number,
                });
            }
            table
                .by_contact
                .insert(customer.contact_number.clone(), customer.id);
            table.by_id.insert(customer.id, customer);
            Ok(())
        })
    }

    fn update(&self, customer: Customer) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check()?;
            {
                let mut left = self.updates_left.lock().map_err(|_| poisoned())?;
                match left.as_mut() {
                    Some(0) => return Err(StoreError::Unavailable("update rejected".to_string())),
                    Some(n) => *n -= 1,
                    None => {}
                }
            }

            let mut table = self.table.lock().map_err(|_| poisoned())?;
            let Some(previous) = table.by_id.get(&customer.id).cloned() else {
                return Err(StoreError::NotFound {
                    entity: "customer",
                    key: customer.id.to_string(),
                });
            };
            if let Some(owner) = table.by_contact.get(&customer.contact_number) {
                if *owner != customer.id {
                    return Err(StoreError::Duplicate {
                        entity: "customer",
                        key: customer.contact_number,
                    });
                }
            }
            table.by_contact.remove(&previous.contact_number);
            table
                .by_contact
                .insert(customer.contact_number.clone(), customer.id);
            table.by_id.insert(customer.id, customer);
            Ok(())
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.check() })
    }
}

// ============================================================================
// Tickets
// ============================================================================

#[derive(Debug, Default)]
struct TicketTable {
    rows: HashMap<TicketNumber, (u64, Ticket)>,
    next_seq: u64,
}

impl TicketTable {
    fn row_mut(&mut self, ticket_number: &TicketNumber) -> Result<&mut Ticket, StoreError> {
        self.rows
            .get_mut(ticket_number)
            .map(|(_, ticket)| ticket)
            .ok_or_else(|| StoreError::ticket_not_found(ticket_number.as_str()))
    }
}

/// In-memory [`TicketStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    table: Arc<Mutex<TicketTable>>,
    offline: Arc<AtomicBool>,
    fail_details: Arc<AtomicBool>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tickets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.rows.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw read with the complete log history.
    #[must_use]
    pub fn raw(&self, ticket_number: &TicketNumber) -> Option<Ticket> {
        self.table
            .lock()
            .ok()?
            .rows
            .get(ticket_number)
            .map(|(_, t)| t.clone())
    }

    /// Every stored ticket number.
    #[must_use]
    pub fn numbers(&self) -> Vec<TicketNumber> {
        self.table
            .lock()
            .map(|t| t.rows.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Put a ticket in place without any checks.
    pub fn seed(&self, ticket: Ticket) {
        if let Ok(mut table) = self.table.lock() {
            let seq = table.next_seq;
            table.next_seq += 1;
            table.rows.insert(ticket.ticket_number.clone(), (seq, ticket));
        }
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Make `update_details` fail.
    pub fn fail_details_updates(&self, fail: bool) {
        self.fail_details.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(offline())
        } else {
            Ok(())
        }
    }

    fn mutate(
        &self,
        ticket_number: &TicketNumber,
        f: impl FnOnce(&mut Ticket) -> Result<(), StoreError>,
    ) -> Result<Ticket, StoreError> {
        self.check()?;
        let mut table = self.table.lock().map_err(|_| poisoned())?;
        let ticket = table.row_mut(ticket_number)?;
        f(ticket)?;
        Ok(ticket.clone())
    }
}

impl TicketStore for InMemoryTicketStore {
    fn insert(&self, ticket: Ticket) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check()?;
            let mut table = self.table.lock().map_err(|_| poisoned())?;
            if table.rows.contains_key(&ticket.ticket_number) {
                return Err(StoreError::Duplicate {
                    entity: "ticket",
                    key: ticket.ticket_number.to_string(),
                });
            }
            let seq = table.next_seq;
            table.next_seq += 1;
            table.rows.insert(ticket.ticket_number.clone(), (seq, ticket));
            Ok(())
        })
    }

    fn find(&self, ticket_number: TicketNumber) -> StoreFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            self.check()?;
            Ok(self
                .table
                .lock()
                .map_err(|_| poisoned())?
                .rows
                .get(&ticket_number)
                .map(|(_, t)| t.clone()))
        })
    }

    fn list(&self) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            self.check()?;
            let table = self.table.lock().map_err(|_| poisoned())?;
            let mut rows: Vec<&(u64, Ticket)> = table.rows.values().collect();
            rows.sort_by(|(seq_a, a), (seq_b, b)| {
                b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
            });
            Ok(rows.into_iter().map(|(_, t)| t.clone()).collect())
        })
    }

    fn count_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            self.check()?;
            let table = self.table.lock().map_err(|_| poisoned())?;
            let count = table
                .rows
                .values()
                .filter(|(_, t)| t.created_at >= start && t.created_at < end)
                .count();
            Ok(u64::try_from(count).unwrap_or(u64::MAX))
        })
    }

    fn update_status(
        &self,
        ticket_number: TicketNumber,
        change: StatusChange,
    ) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            self.mutate(&ticket_number, |ticket| {
                ticket.status = change.status;
                ticket.unit = change.unit;
                ticket.problem = change.problem;
                ticket.logs.push(change.log);
                ticket.updated_at = change.updated_at;
                Ok(())
            })
        })
    }

    fn append_log(&self, ticket_number: TicketNumber, entry: LogEntry) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            self.mutate(&ticket_number, |ticket| {
                ticket.updated_at = entry.created_at;
                ticket.logs.push(entry);
                Ok(())
            })
        })
    }

    fn remove_log(&self, ticket_number: TicketNumber, log_id: LogId) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            self.mutate(&ticket_number, |ticket| {
                let position = ticket
                    .logs
                    .iter()
                    .position(|entry| entry.id == log_id)
                    .ok_or_else(|| StoreError::NotFound {
                        entity: "log entry",
                        key: log_id.to_string(),
                    })?;
                ticket.logs.remove(position);
                Ok(())
            })
        })
    }

    fn update_details(
        &self,
        ticket_number: TicketNumber,
        change: DetailsChange,
    ) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            if self.fail_details.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("details update rejected".to_string()));
            }
            self.mutate(&ticket_number, |ticket| {
                ticket.unit = change.unit;
                ticket.problem = change.problem;
                ticket.logs.push(change.log);
                ticket.updated_at = change.updated_at;
                Ok(())
            })
        })
    }

    fn set_qr_url(&self, ticket_number: TicketNumber, url: String) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            self.mutate(&ticket_number, |ticket| {
                ticket.qr_code_url = Some(url);
                Ok(())
            })
        })
    }

    fn delete(&self, ticket_number: TicketNumber) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check()?;
            self.table
                .lock()
                .map_err(|_| poisoned())?
                .rows
                .remove(&ticket_number)
                .map(|_| ())
                .ok_or_else(|| StoreError::ticket_not_found(ticket_number.as_str()))
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.check() })
    }
}
