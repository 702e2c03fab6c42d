//! Customer directory: de-duplication by contact number.

use crate::customer::{Customer, CustomerUpdate, PersonName, normalize_contact};
use crate::environment::Clock;
use crate::error::{Result, StoreError, TicketError};
use crate::store::CustomerStore;
use crate::types::CustomerId;
use std::sync::Arc;

/// Finds or creates customers keyed by contact number.
///
/// The store's unique index on the contact number is the final arbiter:
/// when two requests race to create the same customer, the loser sees
/// [`StoreError::Duplicate`] and returns the winner's record.
#[derive(Clone)]
pub struct CustomerDirectory {
    store: Arc<dyn CustomerStore>,
    clock: Arc<dyn Clock>,
}

impl CustomerDirectory {
    /// Create a directory over a store.
    #[must_use]
    pub fn new(store: Arc<dyn CustomerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Return the customer owning `contact_number`, creating it if absent.
    ///
    /// Name fields are only used on creation; an existing record is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - [`TicketError::Validation`] for a blank contact number or name
    /// - [`TicketError::Persistence`] if the store fails
    pub async fn find_or_create(&self, contact_number: &str, name: PersonName) -> Result<Customer> {
        let contact_number = normalize_contact(contact_number)?;

        if let Some(existing) = self.store.find_by_contact(contact_number.clone()).await? {
            return Ok(existing);
        }

        let customer = Customer::new(contact_number.clone(), name.normalized()?, self.clock.now());
        match self.store.insert(customer.clone()).await {
            Ok(()) => {
                tracing::info!(customer_id = %customer.id, "Customer created");
                Ok(customer)
            }
            Err(StoreError::Duplicate { .. }) => {
                tracing::debug!(contact = %contact_number, "Lost customer creation race, re-fetching");
                self.store
                    .find_by_contact(contact_number.clone())
                    .await?
                    .ok_or_else(|| {
                        TicketError::Persistence(format!(
                            "customer with contact {contact_number} reported duplicate but not found"
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a customer by id.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotFound`] if no such customer exists.
    pub async fn get(&self, id: CustomerId) -> Result<Customer> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| TicketError::NotFound {
                entity: "Customer",
                key: id.to_string(),
            })
    }

    /// Apply a partial update and persist it.
    ///
    /// # Errors
    ///
    /// - [`TicketError::NotFound`] for an unknown customer
    /// - [`TicketError::Validation`] for blank names
    /// - [`TicketError::Conflict`] if the new contact number is taken
    pub async fn update(&self, id: CustomerId, update: &CustomerUpdate) -> Result<Customer> {
        let current = self.get(id).await?;
        let updated = update.apply(&current)?;
        self.replace(updated.clone()).await?;
        Ok(updated)
    }

    /// Overwrite a customer record as-is (used to revert a failed update).
    pub(crate) async fn replace(&self, customer: Customer) -> Result<()> {
        let contact = customer.contact_number.clone();
        self.store.update(customer).await.map_err(|e| match e {
            StoreError::Duplicate { .. } => {
                TicketError::Conflict(format!("Contact number {contact} belongs to another customer"))
            }
            other => other.into(),
        })
    }
}
