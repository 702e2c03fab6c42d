//! # Repair Desk Testing
//!
//! Testing utilities for the Repair Desk workspace.
//!
//! This crate provides:
//! - In-memory [`CustomerStore`](repair_desk_core::CustomerStore) and
//!   [`TicketStore`](repair_desk_core::TicketStore) implementations
//!   ([`memory`]), also used by the server's `memory` backend
//! - Deterministic collaborators: [`mocks::FixedClock`], scripted suffix
//!   sources, mock QR publishers
//! - A ready-wired lifecycle harness ([`fixtures::TestDesk`])
//! - Property-based testing strategies ([`strategies`])
//!
//! ## Example
//!
//! ```ignore
//! use repair_desk_testing::fixtures::{TestDesk, new_ticket};
//!
//! #[tokio::test]
//! async fn creates_ticket() {
//!     let desk = TestDesk::new();
//!     let created = desk.lifecycle.open(new_ticket("0917-555-0101")).await.unwrap();
//!     assert_eq!(desk.tickets.len(), 1);
//!     assert_eq!(created.ticket.logs.len(), 1);
//! }
//! ```

pub mod fixtures;
pub mod memory;

pub use memory::{InMemoryCustomerStore, InMemoryTicketStore};
pub use mocks::{FixedClock, test_clock};

/// Mock implementations of injected collaborators.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use repair_desk_core::{Clock, QrError, QrPublisher, SuffixSource, TicketNumber};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, so ticket numbers and log timestamps
    /// are reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use repair_desk_testing::mocks::FixedClock;
    /// use repair_desk_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Fixed clock at 2025-01-01 00:00:00 UTC.
    ///
    /// # Panics
    ///
    /// Never in practice; the timestamp is a literal.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("literal timestamp parses")
                .with_timezone(&Utc),
        )
    }

    /// Always yields the same suffix. Forces collisions.
    #[derive(Debug, Clone)]
    pub struct FixedSuffix(pub String);

    impl SuffixSource for FixedSuffix {
        fn next_suffix(&self) -> String {
            self.0.clone()
        }
    }

    /// Yields suffixes from a script, repeating the last one when exhausted.
    #[derive(Debug, Default)]
    pub struct ScriptedSuffix {
        script: Mutex<VecDeque<String>>,
        last: Mutex<String>,
    }

    impl ScriptedSuffix {
        /// Create from a list of suffixes.
        #[must_use]
        pub fn new<I, S>(suffixes: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                script: Mutex::new(suffixes.into_iter().map(Into::into).collect()),
                last: Mutex::new("ZZZZ".to_string()),
            }
        }
    }

    impl SuffixSource for ScriptedSuffix {
        fn next_suffix(&self) -> String {
            let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
            match (next, self.last.lock()) {
                (Some(suffix), Ok(mut last)) => {
                    last.clone_from(&suffix);
                    suffix
                }
                (Some(suffix), Err(_)) => suffix,
                (None, Ok(last)) => last.clone(),
                (None, Err(_)) => "ZZZZ".to_string(),
            }
        }
    }

    /// QR publisher returning `<base>/<ticket_number>.png` and recording calls.
    #[derive(Debug, Clone)]
    pub struct FixedQrPublisher {
        base: String,
        calls: Arc<Mutex<Vec<(TicketNumber, String)>>>,
    }

    impl FixedQrPublisher {
        /// Create with a base URL.
        #[must_use]
        pub fn new(base: impl Into<String>) -> Self {
            Self {
                base: base.into(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// `(ticket_number, check_url)` pairs seen so far.
        #[must_use]
        pub fn calls(&self) -> Vec<(TicketNumber, String)> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    impl QrPublisher for FixedQrPublisher {
        fn publish(
            &self,
            ticket_number: &TicketNumber,
            check_url: &str,
        ) -> Pin<Box<dyn Future<Output = Result<String, QrError>> + Send + '_>> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((ticket_number.clone(), check_url.to_string()));
            }
            let url = format!("{}/{ticket_number}.png", self.base);
            Box::pin(async move { Ok(url) })
        }
    }

    /// QR publisher that always fails with the given error.
    #[derive(Debug, Clone)]
    pub struct FailingQrPublisher(pub QrError);

    impl QrPublisher for FailingQrPublisher {
        fn publish(
            &self,
            _ticket_number: &TicketNumber,
            _check_url: &str,
        ) -> Pin<Box<dyn Future<Output = Result<String, QrError>> + Send + '_>> {
            let err = self.0.clone();
            Box::pin(async move { Err(err) })
        }
    }

    /// QR publisher that answers only after a delay.
    #[derive(Debug, Clone, Copy)]
    pub struct SlowQrPublisher(pub Duration);

    impl QrPublisher for SlowQrPublisher {
        fn publish(
            &self,
            ticket_number: &TicketNumber,
            _check_url: &str,
        ) -> Pin<Box<dyn Future<Output = Result<String, QrError>> + Send + '_>> {
            let delay = self.0;
            let url = format!("https://qr.test/{ticket_number}.png");
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(url)
            })
        }
    }
}

/// Property-based testing strategies.
pub mod strategies {
    use proptest::prelude::*;

    /// Strings made only of whitespace (including the empty string).
    pub fn blank() -> impl Strategy<Value = String> {
        "[ \t\r\n]{0,8}"
    }

    /// Strings that are not an accepted ticket type.
    pub fn bogus_ticket_type() -> impl Strategy<Value = String> {
        ".{0,24}".prop_filter("must not be a valid ticket type", |s| {
            s != "Repair" && s != "Free Checkup"
        })
    }

    /// Strings that are not an accepted status.
    pub fn bogus_status() -> impl Strategy<Value = String> {
        ".{0,16}".prop_filter("must not be a valid status", |s| {
            !matches!(s.as_str(), "Pending" | "Ongoing" | "Completed" | "Return")
        })
    }

    /// Plausible contact numbers.
    pub fn contact_number() -> impl Strategy<Value = String> {
        "09[0-9]{9}"
    }
}

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
