//! Mock provider implementations for testing.
//!
//! Simple in-memory implementations of the provider traits, used by unit
//! and integration tests and by the server's `memory` storage backend.

pub mod session;
pub mod technician;

pub use session::MockSessionStore;
pub use technician::MockTechnicianRepository;
