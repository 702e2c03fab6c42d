//! `PostgreSQL` ticket store.
//!
//! Tickets live in `tickets`; their journal lives in `ticket_logs`, one row
//! per entry, ordered by `seq`. Reads join the two in Rust.

use crate::{is_unique_violation, unavailable};
use chrono::{DateTime, Utc};
use repair_desk_core::ticket::{UNKNOWN_UNIT, UNSPECIFIED_PROBLEM};
use repair_desk_core::{
    CustomerId, DetailsChange, LogEntry, LogId, StatusChange, StoreError, StoreFuture, Ticket,
    TicketNumber, TicketStatus, TicketStore, TicketType,
};
use sqlx::postgres::{PgConnection, PgPool, PgRow};
use sqlx::Row;
use std::collections::HashMap;

const SELECT_TICKET: &str = "SELECT ticket_number, ticket_type, customer_id, unit, problem, status, images, qr_code_url, created_at, updated_at FROM tickets";

/// Tickets and their log journal.
#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Blank text stored by older writers reads back as the sentinel.
fn heal_text(number: &str, field: &'static str, value: String, sentinel: &str) -> String {
    if value.trim().is_empty() {
        tracing::warn!(ticket_number = number, field, "Healing blank stored value");
        sentinel.to_string()
    } else {
        value
    }
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, sqlx::Error> {
    let number: String = row.try_get("ticket_number")?;
    let ticket_type: Option<String> = row.try_get("ticket_type")?;
    let status: String = row.try_get("status")?;
    let unit = heal_text(&number, "unit", row.try_get("unit")?, UNKNOWN_UNIT);
    let problem = heal_text(&number, "problem", row.try_get("problem")?, UNSPECIFIED_PROBLEM);

    Ok(Ticket {
        ticket_number: TicketNumber::new(number),
        ticket_type: TicketType::from_stored(ticket_type.as_deref()),
        customer_id: CustomerId::from_uuid(row.try_get("customer_id")?),
        unit,
        problem,
        status: TicketStatus::from_stored(&status),
        images: row.try_get("images")?,
        logs: Vec::new(),
        qr_code_url: row.try_get("qr_code_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn log_from_row(row: &PgRow) -> Result<(String, LogEntry), sqlx::Error> {
    Ok((
        row.try_get("ticket_number")?,
        LogEntry {
            id: LogId::from_uuid(row.try_get("id")?),
            text: row.try_get("text")?,
            created_at: row.try_get("created_at")?,
        },
    ))
}

fn corrupt(e: sqlx::Error) -> StoreError {
    StoreError::Corrupt(format!("ticket row: {e}"))
}

/// Load one ticket with its full journal on `conn`.
async fn load(conn: &mut PgConnection, number: &str) -> Result<Option<Ticket>, StoreError> {
    let Some(row) = sqlx::query(&format!("{SELECT_TICKET} WHERE ticket_number = $1"))
        .bind(number)
        .fetch_optional(&mut *conn)
        .await
        .map_err(unavailable("find ticket"))?
    else {
        return Ok(None);
    };
    let mut ticket = ticket_from_row(&row).map_err(corrupt)?;

    let rows = sqlx::query(
        "SELECT ticket_number, id, text, created_at FROM ticket_logs WHERE ticket_number = $1 ORDER BY seq",
    )
    .bind(number)
    .fetch_all(&mut *conn)
    .await
    .map_err(unavailable("load ticket logs"))?;

    ticket.logs = rows
        .iter()
        .map(|row| log_from_row(row).map(|(_, entry)| entry))
        .collect::<Result<_, _>>()
        .map_err(corrupt)?;
    Ok(Some(ticket))
}

async fn insert_log(
    conn: &mut PgConnection,
    number: &str,
    entry: &LogEntry,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO ticket_logs (id, ticket_number, text, created_at) VALUES ($1, $2, $3, $4)")
        .bind(entry.id.as_uuid())
        .bind(number)
        .bind(&entry.text)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await
        .map_err(unavailable("append log"))?;
    Ok(())
}

/// Touch `updated_at`, failing with `NotFound` for an unknown ticket.
async fn touch(
    conn: &mut PgConnection,
    number: &str,
    updated_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE tickets SET updated_at = $2 WHERE ticket_number = $1")
        .bind(number)
        .bind(updated_at)
        .execute(&mut *conn)
        .await
        .map_err(unavailable("touch ticket"))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::ticket_not_found(number));
    }
    Ok(())
}

async fn reload(conn: &mut PgConnection, number: &str) -> Result<Ticket, StoreError> {
    load(conn, number)
        .await?
        .ok_or_else(|| StoreError::ticket_not_found(number))
}

impl PgTicketStore {
    async fn write_fields(
        &self,
        number: &TicketNumber,
        status: Option<TicketStatus>,
        unit: &str,
        problem: &str,
        log: &LogEntry,
        updated_at: DateTime<Utc>,
    ) -> Result<Ticket, StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable("begin"))?;

        let result = sqlx::query(
            "UPDATE tickets
             SET status = COALESCE($2, status), unit = $3, problem = $4, updated_at = $5
             WHERE ticket_number = $1",
        )
        .bind(number.as_str())
        .bind(status.map(|s| s.as_str()))
        .bind(unit)
        .bind(problem)
        .bind(updated_at)
        .execute(&mut *tx)
        .await
        .map_err(unavailable("update ticket"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ticket_not_found(number.as_str()));
        }

        insert_log(&mut tx, number.as_str(), log).await?;
        let ticket = reload(&mut tx, number.as_str()).await?;
        tx.commit().await.map_err(unavailable("commit"))?;
        Ok(ticket)
    }
}

impl TicketStore for PgTicketStore {
    fn insert(&self, ticket: Ticket) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(unavailable("begin"))?;

            sqlx::query(
                "INSERT INTO tickets
                 (ticket_number, ticket_type, customer_id, unit, problem, status, images, qr_code_url, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(ticket.ticket_number.as_str())
            .bind(ticket.ticket_type.as_str())
            .bind(ticket.customer_id.as_uuid())
            .bind(&ticket.unit)
            .bind(&ticket.problem)
            .bind(ticket.status.as_str())
            .bind(&ticket.images)
            .bind(&ticket.qr_code_url)
            .bind(ticket.created_at)
            .bind(ticket.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Duplicate {
                        entity: "ticket",
                        key: ticket.ticket_number.to_string(),
                    }
                } else {
                    unavailable("insert ticket")(e)
                }
            })?;

            for entry in &ticket.logs {
                insert_log(&mut tx, ticket.ticket_number.as_str(), entry).await?;
            }

            tx.commit().await.map_err(unavailable("commit"))?;
            Ok(())
        })
    }

    fn find(&self, ticket_number: TicketNumber) -> StoreFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(unavailable("acquire"))?;
            load(&mut conn, ticket_number.as_str()).await
        })
    }

    fn list(&self) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                "{SELECT_TICKET} ORDER BY created_at DESC, ticket_number DESC"
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable("list tickets"))?;
            let mut tickets: Vec<Ticket> = rows
                .iter()
                .map(ticket_from_row)
                .collect::<Result<_, _>>()
                .map_err(corrupt)?;
            if tickets.is_empty() {
                return Ok(tickets);
            }

            let numbers: Vec<String> = tickets
                .iter()
                .map(|t| t.ticket_number.to_string())
                .collect();
            let log_rows = sqlx::query(
                "SELECT ticket_number, id, text, created_at FROM ticket_logs
                 WHERE ticket_number = ANY($1) ORDER BY seq",
            )
            .bind(&numbers)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable("load ticket logs"))?;

            let mut journals: HashMap<String, Vec<LogEntry>> = HashMap::new();
            for row in &log_rows {
                let (number, entry) = log_from_row(row).map_err(corrupt)?;
                journals.entry(number).or_default().push(entry);
            }
            for ticket in &mut tickets {
                if let Some(logs) = journals.remove(ticket.ticket_number.as_str()) {
                    ticket.logs = logs;
                }
            }
            Ok(tickets)
        })
    }

    fn count_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM tickets WHERE created_at >= $1 AND created_at < $2",
            )
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable("count tickets"))?;
            u64::try_from(count).map_err(|_| StoreError::Corrupt(format!("negative count {count}")))
        })
    }

    fn update_status(
        &self,
        ticket_number: TicketNumber,
        change: StatusChange,
    ) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            self.write_fields(
                &ticket_number,
                Some(change.status),
                &change.unit,
                &change.problem,
                &change.log,
                change.updated_at,
            )
            .await
        })
    }

    fn append_log(&self, ticket_number: TicketNumber, entry: LogEntry) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(unavailable("begin"))?;
            touch(&mut tx, ticket_number.as_str(), entry.created_at).await?;
            insert_log(&mut tx, ticket_number.as_str(), &entry).await?;
            let ticket = reload(&mut tx, ticket_number.as_str()).await?;
            tx.commit().await.map_err(unavailable("commit"))?;
            Ok(ticket)
        })
    }

    fn remove_log(&self, ticket_number: TicketNumber, log_id: LogId) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(unavailable("begin"))?;
            let locked = sqlx::query("SELECT ticket_number FROM tickets WHERE ticket_number = $1 FOR UPDATE")
                .bind(ticket_number.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(unavailable("find ticket"))?;
            if locked.is_none() {
                return Err(StoreError::ticket_not_found(ticket_number.as_str()));
            }

            let result = sqlx::query("DELETE FROM ticket_logs WHERE ticket_number = $1 AND id = $2")
                .bind(ticket_number.as_str())
                .bind(log_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(unavailable("remove log"))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound {
                    entity: "log entry",
                    key: log_id.to_string(),
                });
            }

            let ticket = reload(&mut tx, ticket_number.as_str()).await?;
            tx.commit().await.map_err(unavailable("commit"))?;
            Ok(ticket)
        })
    }

    fn update_details(
        &self,
        ticket_number: TicketNumber,
        change: DetailsChange,
    ) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            self.write_fields(
                &ticket_number,
                None,
                &change.unit,
                &change.problem,
                &change.log,
                change.updated_at,
            )
            .await
        })
    }

    fn set_qr_url(&self, ticket_number: TicketNumber, url: String) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(unavailable("begin"))?;
            let result = sqlx::query("UPDATE tickets SET qr_code_url = $2 WHERE ticket_number = $1")
                .bind(ticket_number.as_str())
                .bind(&url)
                .execute(&mut *tx)
                .await
                .map_err(unavailable("set qr url"))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::ticket_not_found(ticket_number.as_str()));
            }
            let ticket = reload(&mut tx, ticket_number.as_str()).await?;
            tx.commit().await.map_err(unavailable("commit"))?;
            Ok(ticket)
        })
    }

    fn delete(&self, ticket_number: TicketNumber) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM tickets WHERE ticket_number = $1")
                .bind(ticket_number.as_str())
                .execute(&self.pool)
                .await
                .map_err(unavailable("delete ticket"))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::ticket_not_found(ticket_number.as_str()));
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
