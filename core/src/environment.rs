//! Injected dependencies shared by every component.
//!
//! Components never read the wall clock directly; they receive a [`Clock`]
//! so tests can pin time (see `FixedClock` in `repair-desk-testing`).

use chrono::{DateTime, Utc};

/// Clock trait for getting current time.
///
/// Abstracted so ticket numbering (which depends on the calendar day) and
/// log timestamps are deterministic under test.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
