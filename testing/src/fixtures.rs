//! Ready-wired lifecycle harness and request fixtures.

use crate::memory::{InMemoryCustomerStore, InMemoryTicketStore};
use crate::mocks::test_clock;
use repair_desk_core::{
    Actor, Clock, LifecycleConfig, NewTicket, PersonName, QrPublisher, RandomSuffix, Role,
    SuffixSource, TicketEnvironment, TicketLifecycle,
};
use std::sync::Arc;

/// A [`TicketLifecycle`] over in-memory stores, with handles to those
/// stores for raw assertions.
#[derive(Clone)]
pub struct TestDesk {
    /// The manager under test
    pub lifecycle: TicketLifecycle,
    /// Customer store behind the manager
    pub customers: InMemoryCustomerStore,
    /// Ticket store behind the manager
    pub tickets: InMemoryTicketStore,
}

impl TestDesk {
    /// Fixed clock at 2025-01-01, random suffixes, no QR publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start customizing the harness.
    #[must_use]
    pub fn builder() -> TestDeskBuilder {
        TestDeskBuilder::default()
    }
}

impl Default for TestDesk {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`TestDesk`].
#[derive(Default)]
pub struct TestDeskBuilder {
    clock: Option<Arc<dyn Clock>>,
    suffixes: Option<Arc<dyn SuffixSource>>,
    qr: Option<Arc<dyn QrPublisher>>,
    config: Option<LifecycleConfig>,
    customers: Option<InMemoryCustomerStore>,
    tickets: Option<InMemoryTicketStore>,
}

impl TestDeskBuilder {
    /// Use a specific clock.
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Use a specific suffix source.
    #[must_use]
    pub fn suffixes(mut self, suffixes: impl SuffixSource + 'static) -> Self {
        self.suffixes = Some(Arc::new(suffixes));
        self
    }

    /// Attach a QR publisher.
    #[must_use]
    pub fn qr(mut self, qr: impl QrPublisher + 'static) -> Self {
        self.qr = Some(Arc::new(qr));
        self
    }

    /// Override the lifecycle configuration.
    #[must_use]
    pub fn config(mut self, config: LifecycleConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share existing stores (e.g. pre-seeded ones).
    #[must_use]
    pub fn stores(mut self, customers: InMemoryCustomerStore, tickets: InMemoryTicketStore) -> Self {
        self.customers = Some(customers);
        self.tickets = Some(tickets);
        self
    }

    /// Wire everything up.
    #[must_use]
    pub fn build(self) -> TestDesk {
        let customers = self.customers.unwrap_or_default();
        let tickets = self.tickets.unwrap_or_default();
        let env = TicketEnvironment {
            clock: self.clock.unwrap_or_else(|| Arc::new(test_clock())),
            customers: Arc::new(customers.clone()),
            tickets: Arc::new(tickets.clone()),
            suffixes: self.suffixes.unwrap_or_else(|| Arc::new(RandomSuffix)),
            qr: self.qr,
        };
        TestDesk {
            lifecycle: TicketLifecycle::new(env, self.config.unwrap_or_default()),
            customers,
            tickets,
        }
    }
}

/// A `Repair` intake for Juan Santos Cruz with the given contact number.
#[must_use]
pub fn new_ticket(contact_number: &str) -> NewTicket {
    NewTicket {
        contact_number: contact_number.to_string(),
        name: PersonName::new("Juan", "Santos", "Cruz"),
        ticket_type: "Repair".to_string(),
        unit: Some("ThinkPad T480".to_string()),
        problem: Some("no power".to_string()),
        images: Vec::new(),
    }
}

/// Technician actor.
#[must_use]
pub fn tech() -> Actor {
    Actor::new("maria", Role::Tech)
}

/// Front-desk actor (may not delete).
#[must_use]
pub fn staff() -> Actor {
    Actor::new("front", Role::Staff)
}

/// Administrator actor.
#[must_use]
pub fn admin() -> Actor {
    Actor::new("admin", Role::Admin)
}
