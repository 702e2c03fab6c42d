//! `PostgreSQL` customer store.

use crate::{is_unique_violation, unavailable};
use repair_desk_core::{Customer, CustomerId, CustomerStore, StoreError, StoreFuture};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

const SELECT_CUSTOMER: &str = "SELECT id, first_name, middle_name, last_name, suffix, contact_number, created_at FROM customers";

/// Customers table, unique on `contact_number`.
#[derive(Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn customer_from_row(row: &PgRow) -> Result<Customer, sqlx::Error> {
    Ok(Customer {
        id: CustomerId::from_uuid(row.try_get("id")?),
        first_name: row.try_get("first_name")?,
        middle_name: row.try_get("middle_name")?,
        last_name: row.try_get("last_name")?,
        suffix: row.try_get("suffix")?,
        contact_number: row.try_get("contact_number")?,
        created_at: row.try_get("created_at")?,
    })
}

fn decode(row: &PgRow) -> Result<Customer, StoreError> {
    customer_from_row(row).map_err(|e| StoreError::Corrupt(format!("customer row: {e}")))
}

impl CustomerStore for PgCustomerStore {
    fn find_by_contact(&self, contact_number: String) -> StoreFuture<'_, Option<Customer>> {
        Box::pin(async move {
            let row = sqlx::query(&format!("{SELECT_CUSTOMER} WHERE contact_number = $1"))
                .bind(&contact_number)
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable("find customer by contact"))?;
            row.as_ref().map(decode).transpose()
        })
    }

    fn find_by_id(&self, id: CustomerId) -> StoreFuture<'_, Option<Customer>> {
        Box::pin(async move {
            let row = sqlx::query(&format!("{SELECT_CUSTOMER} WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable("find customer"))?;
            row.as_ref().map(decode).transpose()
        })
    }

    fn find_many(&self, ids: Vec<CustomerId>) -> StoreFuture<'_, Vec<Customer>> {
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
            let rows = sqlx::query(&format!("{SELECT_CUSTOMER} WHERE id = ANY($1)"))
                .bind(&ids)
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable("find customers"))?;
            rows.iter().map(decode).collect()
        })
    }

    fn insert(&self, customer: Customer) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO customers (id, first_name, middle_name, last_name, suffix, contact_number, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(customer.id.as_uuid())
            .bind(&customer.first_name)
            .bind(&customer.middle_name)
            .bind(&customer.last_name)
            .bind(&customer.suffix)
            .bind(&customer.contact_number)
            .bind(customer.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Duplicate {
                        entity: "customer",
                        key: customer.contact_number.clone(),
                    }
                } else {
                    unavailable("insert customer")(e)
                }
            })?;
            Ok(())
        })
    }

    fn update(&self, customer: Customer) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE customers
                 SET first_name = $2, middle_name = $3, last_name = $4, suffix = $5, contact_number = $6
                 WHERE id = $1",
            )
            .bind(customer.id.as_uuid())
            .bind(&customer.first_name)
            .bind(&customer.middle_name)
            .bind(&customer.last_name)
            .bind(&customer.suffix)
            .bind(&customer.contact_number)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Duplicate {
                        entity: "customer",
                        key: customer.contact_number.clone(),
                    }
                } else {
                    unavailable("update customer")(e)
                }
            })?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound {
                    entity: "customer",
                    key: customer.id.to_string(),
                });
            }
            Ok(())
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(unavailable("ping"))?;
            Ok(())
        })
    }
}
