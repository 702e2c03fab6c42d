//! Ticket lifecycle manager.
//!
//! Owns every mutation of a ticket after intake: creation (with number
//! assignment and QR publishing), status changes, the log journal, the
//! details update with its diff line, and deletion. Reads return the
//! display view with the log list truncated to the most recent entries;
//! the store always keeps the full history.
//!
//! # Example
//!
//! ```ignore
//! let lifecycle = TicketLifecycle::new(env, LifecycleConfig::default());
//! let created = lifecycle.open(NewTicket { .. }).await?;
//! lifecycle
//!     .update_status(&created.ticket.ticket_number, "Ongoing", None, None, &actor)
//!     .await?;
//! ```

use crate::customer::{Customer, CustomerUpdate, PersonName};
use crate::directory::CustomerDirectory;
use crate::environment::Clock;
use crate::error::{Result, TicketError};
use crate::numbering::{DEFAULT_MAX_ATTEMPTS, SuffixSource, TicketNumberGenerator};
use crate::public::PublicView;
use crate::qr::{self, QrError, QrFailurePolicy, QrPublisher};
use crate::store::{CustomerStore, DetailsChange, StatusChange, TicketStore};
use crate::ticket::{
    LogEntry, MAX_IMAGES, MAX_LOG_LEN, Ticket, TicketDetails, normalize_problem, normalize_unit,
};
use crate::types::{Actor, CustomerId, LogId, TicketNumber, TicketStatus, TicketType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Collaborators injected into the lifecycle manager.
#[derive(Clone)]
pub struct TicketEnvironment {
    /// Time source for numbering and log timestamps
    pub clock: Arc<dyn Clock>,
    /// Customer persistence
    pub customers: Arc<dyn CustomerStore>,
    /// Ticket persistence
    pub tickets: Arc<dyn TicketStore>,
    /// Ticket number suffixes
    pub suffixes: Arc<dyn SuffixSource>,
    /// QR publisher; `None` disables QR generation
    pub qr: Option<Arc<dyn QrPublisher>>,
}

/// Tunables for the lifecycle manager.
#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    /// Public status page the QR code points at
    pub status_page_url: String,
    /// Upper bound on one QR publish call
    pub qr_timeout: Duration,
    /// What to do with the ticket when QR publishing fails
    pub qr_failure: QrFailurePolicy,
    /// Ticket number assignment attempts before giving up
    pub max_number_attempts: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            status_page_url: "http://localhost:5000/checking_ticket_status.html".to_string(),
            qr_timeout: Duration::from_secs(10),
            qr_failure: QrFailurePolicy::default(),
            max_number_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Intake request: customer details plus the ticket itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewTicket {
    /// Customer contact number (de-duplication key)
    pub contact_number: String,
    /// Customer name, used only if the customer is new
    pub name: PersonName,
    /// `Free Checkup` or `Repair`
    pub ticket_type: String,
    /// Device description
    pub unit: Option<String>,
    /// Reported problem
    pub problem: Option<String>,
    /// Image references
    pub images: Vec<String>,
}

/// Result of ticket creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCreated {
    /// The created ticket
    pub ticket: TicketDetails,
    /// Public status-check URL for this ticket
    pub check_url: String,
    /// QR artifact URL, if one was published
    pub qr_code_url: Option<String>,
    /// Why QR publishing failed, when the ticket was kept without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_error: Option<String>,
}

/// The ticket lifecycle manager.
#[derive(Clone)]
pub struct TicketLifecycle {
    env: TicketEnvironment,
    directory: CustomerDirectory,
    numbers: TicketNumberGenerator,
    config: LifecycleConfig,
}

impl TicketLifecycle {
    /// Wire up the manager and its directory and number generator.
    #[must_use]
    pub fn new(env: TicketEnvironment, config: LifecycleConfig) -> Self {
        let directory = CustomerDirectory::new(Arc::clone(&env.customers), Arc::clone(&env.clock));
        let numbers = TicketNumberGenerator::new(
            Arc::clone(&env.tickets),
            Arc::clone(&env.clock),
            Arc::clone(&env.suffixes),
            config.max_number_attempts,
        );
        Self {
            env,
            directory,
            numbers,
            config,
        }
    }

    /// The customer directory used by this manager.
    #[must_use]
    pub const fn directory(&self) -> &CustomerDirectory {
        &self.directory
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Full intake: find or create the customer, then create the ticket.
    ///
    /// The ticket type is checked before the customer is touched.
    ///
    /// # Errors
    ///
    /// Everything [`Self::create`] and
    /// [`CustomerDirectory::find_or_create`] can return.
    pub async fn open(&self, request: NewTicket) -> Result<TicketCreated> {
        request.ticket_type.parse::<TicketType>()?;
        let customer = self
            .directory
            .find_or_create(&request.contact_number, request.name)
            .await?;
        self.create(
            customer.id,
            &request.ticket_type,
            request.unit.as_deref(),
            request.problem.as_deref(),
            request.images,
        )
        .await
    }

    /// Create a ticket for an existing customer.
    ///
    /// # Errors
    ///
    /// - [`TicketError::InvalidTicketType`] for an unknown type
    /// - [`TicketError::Validation`] for too many images
    /// - [`TicketError::NotFound`] for an unknown customer
    /// - [`TicketError::GenerationExhausted`] if no unique number was found
    /// - [`TicketError::Upstream`] if QR publishing failed under
    ///   [`QrFailurePolicy::Rollback`]
    /// - [`TicketError::Inconsistent`] if that rollback could not delete
    ///   the ticket
    pub async fn create(
        &self,
        customer_id: CustomerId,
        ticket_type: &str,
        unit: Option<&str>,
        problem: Option<&str>,
        images: Vec<String>,
    ) -> Result<TicketCreated> {
        let ticket_type: TicketType = ticket_type.parse()?;
        if images.len() > MAX_IMAGES {
            return Err(TicketError::Validation(format!(
                "At most {MAX_IMAGES} images may be attached"
            )));
        }
        let customer = self.directory.get(customer_id).await?;
        let unit = normalize_unit(unit);
        let problem = normalize_problem(problem);
        let now = self.env.clock.now();
        let intake_line = format!(
            "[SYSTEM] Ticket created ({ticket_type}) for {} | Unit: {unit} | Problem: {problem}",
            customer.full_name()
        );

        let tickets = Arc::clone(&self.env.tickets);
        let ticket = self
            .numbers
            .assign(|ticket_number| {
                let ticket = Ticket {
                    ticket_number,
                    ticket_type,
                    customer_id,
                    unit: unit.clone(),
                    problem: problem.clone(),
                    status: TicketStatus::Pending,
                    images: images.clone(),
                    logs: vec![LogEntry::new(intake_line.clone(), now)],
                    qr_code_url: None,
                    created_at: now,
                    updated_at: now,
                };
                let tickets = Arc::clone(&tickets);
                async move { tickets.insert(ticket.clone()).await.map(|()| ticket) }
            })
            .await?;

        metrics::counter!("repair_desk_tickets_created_total").increment(1);
        tracing::info!(
            ticket_number = %ticket.ticket_number,
            ticket_type = %ticket_type,
            customer_id = %customer_id,
            "Ticket created"
        );

        let check_url = qr::check_url(&self.config.status_page_url, &ticket.ticket_number);
        let (ticket, qr_error) = self.attach_qr(ticket, &check_url).await?;
        let qr_code_url = ticket.qr_code_url.clone();

        Ok(TicketCreated {
            ticket: TicketDetails::new(ticket, Some(customer)),
            check_url,
            qr_code_url,
            qr_error,
        })
    }

    async fn attach_qr(&self, ticket: Ticket, check_url: &str) -> Result<(Ticket, Option<String>)> {
        let Some(publisher) = &self.env.qr else {
            return Ok((ticket, None));
        };

        let number = ticket.ticket_number.clone();
        let published = tokio::time::timeout(
            self.config.qr_timeout,
            publisher.publish(&number, check_url),
        )
        .await
        .unwrap_or(Err(QrError::Timeout(self.config.qr_timeout)));

        match published {
            Ok(url) => {
                let ticket = self.env.tickets.set_qr_url(number, url).await?;
                Ok((ticket, None))
            }
            Err(err) => {
                metrics::counter!("repair_desk_qr_failures_total").increment(1);
                match self.config.qr_failure {
                    QrFailurePolicy::Rollback => {
                        tracing::warn!(ticket_number = %number, error = %err, "QR publishing failed, rolling back ticket");
                        if let Err(delete_err) = self.env.tickets.delete(number.clone()).await {
                            tracing::error!(
                                ticket_number = %number,
                                qr_error = %err,
                                delete_error = %delete_err,
                                "Rollback after QR failure did not delete ticket"
                            );
                            return Err(TicketError::Inconsistent(format!(
                                "QR publishing failed for ticket {number} and the ticket could not be removed: {delete_err}"
                            )));
                        }
                        Err(err.into())
                    }
                    QrFailurePolicy::KeepWithoutQr => {
                        tracing::warn!(ticket_number = %number, error = %err, "QR publishing failed, keeping ticket without QR");
                        Ok((ticket, Some(err.to_string())))
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Change the status, optionally updating unit/problem.
    ///
    /// `None` keeps the stored unit/problem; a blank value stores the
    /// sentinel. The status line is appended in the same store operation.
    ///
    /// # Errors
    ///
    /// - [`TicketError::InvalidStatus`] (nothing is written)
    /// - [`TicketError::NotFound`] for an unknown ticket
    pub async fn update_status(
        &self,
        ticket_number: &TicketNumber,
        status: &str,
        unit: Option<&str>,
        problem: Option<&str>,
        actor: &Actor,
    ) -> Result<TicketDetails> {
        let status: TicketStatus = status.parse()?;
        let current = self.load(ticket_number).await?;
        let unit = unit.map_or_else(|| current.unit.clone(), |u| normalize_unit(Some(u)));
        let problem = problem.map_or_else(|| current.problem.clone(), |p| normalize_problem(Some(p)));

        let now = self.env.clock.now();
        let line = format!(
            "[SYSTEM] Ticket marked as {} by {} on {} | Unit: {unit} | Problem: {problem}",
            status.as_str().to_uppercase(),
            actor.username,
            now.format("%Y-%m-%d %H:%M:%S UTC"),
        );

        let updated = self
            .env
            .tickets
            .update_status(
                ticket_number.clone(),
                StatusChange {
                    status,
                    unit,
                    problem,
                    log: LogEntry::new(line, now),
                    updated_at: now,
                },
            )
            .await?;

        metrics::counter!("repair_desk_status_changes_total", "status" => status.as_str())
            .increment(1);
        tracing::info!(
            ticket_number = %ticket_number,
            from = %current.status,
            to = %status,
            actor = %actor.username,
            "Ticket status changed"
        );

        self.details(updated).await
    }

    /// Append a free-text log entry.
    ///
    /// # Errors
    ///
    /// - [`TicketError::Validation`] for blank or over-long text
    /// - [`TicketError::NotFound`] for an unknown ticket
    pub async fn append_log(&self, ticket_number: &TicketNumber, text: &str) -> Result<TicketDetails> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TicketError::Validation("Log text is required".to_string()));
        }
        if text.chars().count() > MAX_LOG_LEN {
            return Err(TicketError::Validation(format!(
                "Log text exceeds {MAX_LOG_LEN} characters"
            )));
        }

        let entry = LogEntry::new(text, self.env.clock.now());
        let updated = self
            .env
            .tickets
            .append_log(ticket_number.clone(), entry)
            .await?;
        tracing::debug!(ticket_number = %ticket_number, "Log appended");
        self.details(updated).await
    }

    /// Remove one log entry by id.
    ///
    /// # Errors
    ///
    /// - [`TicketError::Validation`] for a malformed id
    /// - [`TicketError::NotFound`] if the ticket or the entry is unknown
    pub async fn delete_log(&self, ticket_number: &TicketNumber, log_id: &str) -> Result<TicketDetails> {
        let log_id = LogId::parse(log_id)?;
        let updated = self
            .env
            .tickets
            .remove_log(ticket_number.clone(), log_id)
            .await?;
        tracing::info!(ticket_number = %ticket_number, log_id = %log_id, "Log entry removed");
        self.details(updated).await
    }

    /// Update the linked customer and the ticket's unit/problem, recording
    /// one audit line with the before/after values.
    ///
    /// The customer is written first. If the ticket write then fails the
    /// customer is restored; if that also fails the error is
    /// [`TicketError::Inconsistent`].
    ///
    /// # Errors
    ///
    /// - [`TicketError::NotFound`] for an unknown ticket or customer
    /// - [`TicketError::Validation`] for blank names
    /// - [`TicketError::Conflict`] if the new contact number is taken
    /// - [`TicketError::Inconsistent`] as described above
    pub async fn update_details(
        &self,
        ticket_number: &TicketNumber,
        update: &CustomerUpdate,
        unit: Option<&str>,
        problem: Option<&str>,
    ) -> Result<TicketDetails> {
        let ticket = self.load(ticket_number).await?;
        let before = self.directory.get(ticket.customer_id).await?;
        let after = update.apply(&before)?;
        let new_unit = unit.map_or_else(|| ticket.unit.clone(), |u| normalize_unit(Some(u)));
        let new_problem =
            problem.map_or_else(|| ticket.problem.clone(), |p| normalize_problem(Some(p)));

        let line = diff_line(&before, &after, &ticket, &new_unit, &new_problem);
        let customer_changed = after != before;
        if customer_changed {
            self.directory.replace(after.clone()).await?;
        }

        let now = self.env.clock.now();
        let change = DetailsChange {
            unit: new_unit,
            problem: new_problem,
            log: LogEntry::new(line, now),
            updated_at: now,
        };

        match self.env.tickets.update_details(ticket_number.clone(), change).await {
            Ok(updated) => {
                tracing::info!(ticket_number = %ticket_number, customer_changed, "Ticket details updated");
                Ok(TicketDetails::new(updated, Some(after)))
            }
            Err(ticket_err) => {
                if customer_changed {
                    if let Err(revert_err) = self.directory.replace(before).await {
                        tracing::error!(
                            ticket_number = %ticket_number,
                            customer_id = %after.id,
                            ticket_error = %ticket_err,
                            revert_error = %revert_err,
                            "Customer updated but ticket update failed and revert failed"
                        );
                        return Err(TicketError::Inconsistent(format!(
                            "customer {} was updated but ticket {ticket_number} was not: {ticket_err}",
                            after.id
                        )));
                    }
                }
                Err(ticket_err.into())
            }
        }
    }

    /// Hard-delete a ticket and its logs.
    ///
    /// # Errors
    ///
    /// - [`TicketError::Forbidden`] unless the actor is admin or tech
    /// - [`TicketError::NotFound`] for an unknown ticket
    pub async fn delete(&self, ticket_number: &TicketNumber, actor: &Actor) -> Result<()> {
        if !actor.role.can_delete_tickets() {
            tracing::warn!(ticket_number = %ticket_number, actor = %actor.username, role = %actor.role, "Delete refused");
            return Err(TicketError::Forbidden {
                role: actor.role.to_string(),
                action: "delete tickets",
            });
        }
        self.env.tickets.delete(ticket_number.clone()).await?;
        metrics::counter!("repair_desk_tickets_deleted_total").increment(1);
        tracing::info!(ticket_number = %ticket_number, actor = %actor.username, "Ticket deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// One ticket with its customer and recent logs.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotFound`] for an unknown ticket.
    pub async fn get(&self, ticket_number: &TicketNumber) -> Result<TicketDetails> {
        let ticket = self.load(ticket_number).await?;
        self.details(ticket).await
    }

    /// All tickets, newest first.
    ///
    /// # Errors
    ///
    /// [`TicketError::Persistence`] if the store fails.
    pub async fn list(&self) -> Result<Vec<TicketDetails>> {
        let tickets = self.env.tickets.list().await?;
        let mut ids: Vec<CustomerId> = tickets.iter().map(|t| t.customer_id).collect();
        ids.sort_by_key(|id| *id.as_uuid());
        ids.dedup();

        let customers: HashMap<CustomerId, Customer> = self
            .env
            .customers
            .find_many(ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(tickets
            .into_iter()
            .map(|ticket| {
                let customer = customers.get(&ticket.customer_id).cloned();
                TicketDetails::new(ticket, customer)
            })
            .collect())
    }

    /// Redacted view for the public status page.
    ///
    /// # Errors
    ///
    /// [`TicketError::NotFound`] for an unknown ticket.
    pub async fn public_view(&self, ticket_number: &TicketNumber) -> Result<PublicView> {
        let ticket = self.load(ticket_number).await?;
        let customer = self.env.customers.find_by_id(ticket.customer_id).await?;
        Ok(PublicView::project(&ticket, customer.as_ref()))
    }

    /// Probe both stores.
    ///
    /// # Errors
    ///
    /// [`TicketError::Persistence`] if either store is unreachable.
    pub async fn ping(&self) -> Result<()> {
        self.env.tickets.ping().await?;
        self.env.customers.ping().await?;
        Ok(())
    }

    async fn load(&self, ticket_number: &TicketNumber) -> Result<Ticket> {
        self.env
            .tickets
            .find(ticket_number.clone())
            .await?
            .ok_or_else(|| TicketError::ticket_not_found(ticket_number.as_str()))
    }

    async fn details(&self, ticket: Ticket) -> Result<TicketDetails> {
        let customer = self.env.customers.find_by_id(ticket.customer_id).await?;
        if customer.is_none() {
            tracing::warn!(
                ticket_number = %ticket.ticket_number,
                customer_id = %ticket.customer_id,
                "Ticket references a missing customer"
            );
        }
        Ok(TicketDetails::new(ticket, customer))
    }
}

fn diff_line(
    before: &Customer,
    after: &Customer,
    ticket: &Ticket,
    new_unit: &str,
    new_problem: &str,
) -> String {
    format!(
        "Update - Customer: {} → {} | Contact: {} → {} | Unit: {} → {new_unit} | Problem: {} → {new_problem}",
        before.full_name(),
        after.full_name(),
        before.contact_number,
        after.contact_number,
        ticket.unit,
        ticket.problem,
    )
}
