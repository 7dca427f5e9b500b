//! Retention sweeper for the shared event store.
//!
//! Each run reads the clock once, computes `cutoff = now - max_event_age`,
//! and deletes every record whose timestamp is strictly earlier than the
//! cutoff. A record exactly `max_event_age` old survives, so every event is
//! visible for at least the full retention window.
//!
//! The sweeper ignores `consumers` and `event_class` entirely: retention is
//! a safety net that holds whether or not delivery ever completed.
//!
//! # Design Principles
//!
//! - One clock read per run, so every deletion in a sweep uses the same cutoff.
//! - Cutoff arithmetic is checked; overflow is an error, never a wrap.
//! - No state between runs and no retries. Failures propagate to the caller
//!   and the next scheduled run recomputes the cutoff from scratch.
//! - Several nodes may sweep the same store concurrently. Deletes are
//!   idempotent and any node applying the rule removes the same records
//!   (modulo clock skew), so no lease is taken.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use herald_db::{DbError, EventStore};
use herald_types::truncate_to_millis;
use tracing::info;

use crate::clock::{Clock, SystemClock};

/// Default retention window: one day.
pub const DEFAULT_MAX_EVENT_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Whether a sweep can subtract `max_event_age` from any instant at or
/// after the Unix epoch without leaving `chrono`'s range.
pub fn is_representable_age(max_event_age: Duration) -> bool {
    TimeDelta::from_std(max_event_age)
        .ok()
        .and_then(|age| DateTime::<Utc>::UNIX_EPOCH.checked_sub_signed(age))
        .is_some()
}

/// Errors that can occur during a sweep.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// The event store rejected the delete or could not be reached.
    #[error("event store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: DbError,
    },

    /// `now - max_event_age` is not representable.
    #[error("cannot compute cutoff: {now} minus {max_event_age:?} is out of range")]
    Cutoff {
        /// The instant the sweep started at.
        now: DateTime<Utc>,
        /// The configured retention window.
        max_event_age: Duration,
    },

    /// The sweeper was constructed with an unusable setting.
    #[error("invalid sweeper configuration: {reason}")]
    Config {
        /// Explanation of what is wrong.
        reason: String,
    },
}

/// Outcome of a single successful sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// The instant the sweep observed as "now".
    pub now: DateTime<Utc>,
    /// Records strictly older than this were deleted.
    pub cutoff: DateTime<Utc>,
    /// Number of records removed.
    pub deleted: u64,
}

/// Compute the retention cutoff for a sweep observed at `now`.
///
/// `now` is truncated to whole milliseconds first, matching the precision
/// of stored timestamps.
///
/// # Errors
///
/// Returns [`SweepError::Cutoff`] if the subtraction leaves the range
/// `chrono` can represent.
pub fn compute_cutoff(
    now: DateTime<Utc>,
    max_event_age: Duration,
) -> Result<DateTime<Utc>, SweepError> {
    let out_of_range = || SweepError::Cutoff {
        now,
        max_event_age,
    };
    let age = TimeDelta::from_std(max_event_age).map_err(|_err| out_of_range())?;
    truncate_to_millis(now)
        .checked_sub_signed(age)
        .ok_or_else(out_of_range)
}

/// Deletes records that aged out of the retention window.
#[derive(Debug)]
pub struct RetentionSweeper<S, C = SystemClock> {
    store: S,
    clock: C,
    max_event_age: Duration,
}

impl<S: EventStore> RetentionSweeper<S, SystemClock> {
    /// Create a sweeper that reads the wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Config`] if `max_event_age` is zero or out of
    /// range.
    pub fn with_system_clock(store: S, max_event_age: Duration) -> Result<Self, SweepError> {
        Self::new(store, SystemClock, max_event_age)
    }
}

impl<S: EventStore, C: Clock> RetentionSweeper<S, C> {
    /// Create a sweeper over `store` using `clock` as its time source.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Config`] if `max_event_age` is zero or too
    /// large for a cutoff to be computed.
    pub fn new(store: S, clock: C, max_event_age: Duration) -> Result<Self, SweepError> {
        if max_event_age.is_zero() {
            return Err(SweepError::Config {
                reason: "max_event_age must be greater than zero".to_owned(),
            });
        }
        if !is_representable_age(max_event_age) {
            return Err(SweepError::Config {
                reason: format!("max_event_age {max_event_age:?} is out of range"),
            });
        }
        Ok(Self {
            store,
            clock,
            max_event_age,
        })
    }

    /// The configured retention window.
    pub const fn max_event_age(&self) -> Duration {
        self.max_event_age
    }

    /// The store being swept.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Run one sweep.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Store`] if the delete fails, or
    /// [`SweepError::Cutoff`] if the cutoff cannot be represented.
    /// Nothing is retried.
    pub async fn run(&self) -> Result<SweepReport, SweepError> {
        let now = self.clock.now();
        let cutoff = compute_cutoff(now, self.max_event_age)?;

        let deleted = self.store.delete_older_than(cutoff).await?;

        info!(
            deleted,
            cutoff_ms = cutoff.timestamp_millis(),
            max_event_age_ms = u64::try_from(self.max_event_age.as_millis()).unwrap_or(u64::MAX),
            "Removed expired cluster events"
        );

        Ok(SweepReport {
            now,
            cutoff,
            deleted,
        })
    }
}
