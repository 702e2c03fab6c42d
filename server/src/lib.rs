//! Repair Desk HTTP server.
//!
//! Wires the ticket core, technician auth and the chosen storage backend
//! into an Axum application.
//!
//! # Architecture
//!
//! ```text
//!  Config::from_env ──► AppContext::build ──► routes::build_router
//!                          │
//!          ┌───────────────┼────────────────┬──────────────┐
//!          ▼               ▼                ▼              ▼
//!   TicketLifecycle    AuthService     ImageStore    QrPublisher
//!          │               │
//!          └──── PostgreSQL or in-memory stores ────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: environment configuration
//! - [`context`]: shared application context
//! - [`api`]: ticket, status-page and technician handlers
//! - [`qr`]: QR publishers
//! - [`uploads`]: intake image storage
//! - [`routes`]: router and response layers
//! - [`telemetry`]: tracing and Prometheus setup

pub mod api;
pub mod config;
pub mod context;
pub mod qr;
pub mod routes;
pub mod telemetry;
pub mod uploads;

pub use config::Config;
pub use context::AppContext;
pub use routes::build_router;
