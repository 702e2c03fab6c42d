//! Ticket number generation.
//!
//! Numbers look like `TKT-20250101-310-K7Q2`:
//!
//! - the UTC calendar day of the injected clock;
//! - a coarse counter, `300 + 10 × tickets created that day`, which is
//!   human-friendly but repeats under concurrent creation;
//! - a random 4-character suffix from `[A-Z0-9]`, the actual uniqueness
//!   guard.
//!
//! Uniqueness is enforced at persistence time. [`TicketNumberGenerator::assign`]
//! retries with a fresh candidate when the store reports a duplicate and
//! gives up after a bounded number of attempts.

use crate::environment::Clock;
use crate::error::{Result, StoreError, TicketError};
use crate::store::TicketStore;
use crate::types::TicketNumber;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;

/// Counter value for the first ticket of the day.
pub const COUNTER_BASE: u64 = 300;

/// Counter increment per ticket already created that day.
pub const COUNTER_STEP: u64 = 10;

/// Length of the random suffix.
pub const SUFFIX_LEN: usize = 4;

/// Characters the suffix is drawn from.
pub const SUFFIX_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default cap on number assignment attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Source of ticket number suffixes.
pub trait SuffixSource: Send + Sync {
    /// Produce a [`SUFFIX_LEN`]-character suffix.
    fn next_suffix(&self) -> String;
}

/// Uniformly random suffixes from [`SUFFIX_ALPHABET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn next_suffix(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..SUFFIX_LEN)
            .map(|_| char::from(SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())]))
            .collect()
    }
}

/// Start and end (exclusive) of the UTC day containing `now`.
#[must_use]
pub fn utc_day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Generates ticket numbers and assigns them with collision retry.
#[derive(Clone)]
pub struct TicketNumberGenerator {
    tickets: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
    suffixes: Arc<dyn SuffixSource>,
    max_attempts: u32,
}

impl TicketNumberGenerator {
    /// Create a generator. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        suffixes: Arc<dyn SuffixSource>,
        max_attempts: u32,
    ) -> Self {
        Self {
            tickets,
            clock,
            suffixes,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Configured attempt cap.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Compute a candidate number. Not guaranteed unique on its own.
    ///
    /// # Errors
    ///
    /// [`TicketError::Persistence`] if today's tickets cannot be counted.
    pub async fn next(&self) -> Result<TicketNumber> {
        let now = self.clock.now();
        let (start, end) = utc_day_bounds(now);
        let created_today = self.tickets.count_created_between(start, end).await?;
        let counter = COUNTER_BASE + COUNTER_STEP * created_today;
        Ok(TicketNumber::compose(
            now.date_naive(),
            counter,
            &self.suffixes.next_suffix(),
        ))
    }

    /// Generate candidates and hand each to `persist` until one is accepted.
    ///
    /// A [`StoreError::Duplicate`] from `persist` means the number is taken
    /// and a fresh candidate is tried. Any other error aborts.
    ///
    /// # Errors
    ///
    /// - [`TicketError::GenerationExhausted`] after `max_attempts` collisions
    /// - any non-duplicate persistence error, converted
    pub async fn assign<T, F, Fut>(&self, mut persist: F) -> Result<T>
    where
        F: FnMut(TicketNumber) -> Fut,
        Fut: Future<Output = std::result::Result<T, StoreError>>,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = self.next().await?;
            match persist(candidate.clone()).await {
                Ok(value) => return Ok(value),
                Err(StoreError::Duplicate { .. }) => {
                    metrics::counter!("repair_desk_ticket_number_collisions_total").increment(1);
                    tracing::warn!(
                        ticket_number = %candidate,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Ticket number collision, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(attempts = self.max_attempts, "Ticket number generation exhausted");
        Err(TicketError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}
