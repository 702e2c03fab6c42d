//! # Repair Desk Core
//!
//! Ticket lifecycle, numbering and customer directory for a repair-shop
//! ticketing backend.
//!
//! ## Components
//!
//! - **Customer Directory** ([`directory`]): de-duplicates customers by
//!   contact number, safe under concurrent creation.
//! - **Ticket Number Generator** ([`numbering`]): `TKT-<YYYYMMDD>-<counter>-<SUFFIX>`
//!   numbers with persistence-time collision retry.
//! - **Ticket Lifecycle Manager** ([`lifecycle`]): creation, status changes,
//!   the bounded log journal, details updates and deletion.
//! - **Public Lookup Projector** ([`public`]): the redacted status-page view.
//! - **QR collaborator** ([`qr`]): trait for publishing the status-check QR.
//!
//! ## Architecture
//!
//! The core owns no I/O. Persistence goes through the [`store`] traits and
//! time through [`Clock`]; both are injected via [`TicketEnvironment`] so
//! the same code runs against `PostgreSQL` in production and in-memory
//! stores in tests.
//!
//! ## Example
//!
//! ```ignore
//! use repair_desk_core::*;
//!
//! let lifecycle = TicketLifecycle::new(
//!     TicketEnvironment {
//!         clock: Arc::new(SystemClock),
//!         customers,
//!         tickets,
//!         suffixes: Arc::new(RandomSuffix),
//!         qr: None,
//!     },
//!     LifecycleConfig::default(),
//! );
//!
//! let created = lifecycle
//!     .open(NewTicket {
//!         contact_number: "0917-555-0101".into(),
//!         name: PersonName::new("Juan", "Santos", "Cruz"),
//!         ticket_type: "Repair".into(),
//!         unit: Some("ThinkPad T480".into()),
//!         problem: Some("no power".into()),
//!         images: vec![],
//!     })
//!     .await?;
//! ```

pub mod customer;
pub mod directory;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod numbering;
pub mod public;
pub mod qr;
pub mod store;
pub mod ticket;
pub mod types;

pub use customer::{Customer, CustomerUpdate, PersonName};
pub use directory::CustomerDirectory;
pub use environment::{Clock, SystemClock};
pub use error::{Result, StoreError, TicketError};
pub use lifecycle::{LifecycleConfig, NewTicket, TicketCreated, TicketEnvironment, TicketLifecycle};
pub use numbering::{RandomSuffix, SuffixSource, TicketNumberGenerator};
pub use public::{PublicCustomer, PublicView};
pub use qr::{QrError, QrFailurePolicy, QrPublisher};
pub use store::{CustomerStore, DetailsChange, StatusChange, StoreFuture, TicketStore};
pub use ticket::{LogEntry, Ticket, TicketDetails};
pub use types::{Actor, CustomerId, LogId, Role, TicketNumber, TicketStatus, TicketType};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
