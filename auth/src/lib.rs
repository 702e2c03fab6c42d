//! # Repair Desk Authentication
//!
//! Technician accounts, password hashing and bearer-token sessions.
//!
//! ## Features
//!
//! - **bcrypt**: passwords are stored as bcrypt hashes ([`password`]),
//!   computed off the async workers
//! - **Opaque tokens**: 256-bit random bearer tokens; only their digest is
//!   stored ([`token`])
//! - **Roles**: `admin`, `tech`, `staff`, carried into every mutation as a
//!   [`repair_desk_core::Actor`]
//! - **Testable**: in-memory providers in [`mocks`] (`test-utils` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use repair_desk_auth::*;
//!
//! let auth = AuthService::new(technicians, sessions, clock, AuthConfig::default());
//! auth.signup("maria", "s3cret-pass", None).await?;
//! let issued = auth.login("maria", "s3cret-pass").await?;
//! let actor = auth.authenticate(&issued.token).await?;
//! assert_eq!(actor.username, "maria");
//! ```

// Public modules
pub mod config;
pub mod error;
pub mod password;
pub mod providers;
pub mod service;
pub mod state;
pub mod token;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use config::AuthConfig;
pub use error::{AuthError, Result};
pub use providers::{AuthFuture, SessionStore, TechnicianRepository};
pub use service::AuthService;
pub use state::{IssuedToken, Session, Technician, TechnicianId, TechnicianProfile};
