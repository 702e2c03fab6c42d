//! HTTP API handlers.

pub mod public;
pub mod tech;
pub mod tickets;
