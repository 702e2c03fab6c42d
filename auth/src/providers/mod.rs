//! Storage interfaces for accounts and sessions.
//!
//! The auth service depends on these traits; `repair-desk-postgres`
//! provides the production implementations and [`crate::mocks`] the
//! in-memory ones.
//!
//! Methods return boxed futures so the service can hold
//! `Arc<dyn TechnicianRepository>` and pick a backend at startup.

pub mod session;
pub mod technician;

pub use session::SessionStore;
pub use technician::TechnicianRepository;

use crate::error::AuthError;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by provider methods.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AuthError>> + Send + 'a>>;
