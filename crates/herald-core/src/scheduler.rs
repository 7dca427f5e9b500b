//! Periodic invocation of the retention sweeper.
//!
//! [`run_periodically`] waits for the initial delay, then runs the sweeper
//! once per period until the shutdown signal flips to `true`. Runs never
//! overlap: the next tick is scheduled only after the previous sweep
//! returned. A failed sweep is logged and the loop carries on; the next run
//! recomputes its cutoff from the clock, so nothing is missed for good.

use std::time::Duration;

use herald_db::EventStore;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::config::RetentionConfig;
use crate::sweeper::RetentionSweeper;

/// Shortest accepted period. `tokio::time::interval` panics on zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// When and how often the sweeper runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Wait before the first run.
    pub initial_delay: Duration,
    /// Time between consecutive runs.
    pub period: Duration,
}

impl Schedule {
    /// Run immediately, then every `period` (at least one millisecond).
    pub fn new(period: Duration) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            period: period.max(MIN_PERIOD),
        }
    }

    /// Delay the first run.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

impl From<&RetentionConfig> for Schedule {
    fn from(config: &RetentionConfig) -> Self {
        Self::new(config.sweep_interval()).with_initial_delay(config.initial_delay())
    }
}

/// Counters accumulated over the scheduler's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// Sweeps attempted.
    pub runs: u64,
    /// Sweeps that returned an error.
    pub failures: u64,
    /// Records deleted across all successful sweeps.
    pub deleted: u64,
}

/// Run `sweeper` on `schedule` until `shutdown` becomes `true` or its
/// sender is dropped.
pub async fn run_periodically<S, C>(
    sweeper: &RetentionSweeper<S, C>,
    schedule: Schedule,
    mut shutdown: watch::Receiver<bool>,
) -> SchedulerSummary
where
    S: EventStore,
    C: Clock,
{
    let mut summary = SchedulerSummary::default();

    let start = Instant::now()
        .checked_add(schedule.initial_delay)
        .unwrap_or_else(|| {
            warn!(
                initial_delay_ms = as_millis(schedule.initial_delay),
                "Initial delay out of range, sweeping immediately"
            );
            Instant::now()
        });
    let mut ticker = tokio::time::interval_at(start, schedule.period.max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        initial_delay_ms = as_millis(schedule.initial_delay),
        period_ms = as_millis(schedule.period),
        max_event_age_ms = as_millis(sweeper.max_event_age()),
        "Retention scheduler starting"
    );

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() {
                    info!("Shutdown sender dropped");
                    break;
                }
            }

            _ = ticker.tick() => {
                summary.runs = summary.runs.saturating_add(1);
                match sweeper.run().await {
                    Ok(report) => {
                        summary.deleted = summary.deleted.saturating_add(report.deleted);
                    }
                    Err(e) => {
                        summary.failures = summary.failures.saturating_add(1);
                        error!(error = %e, "Retention sweep failed, retrying next period");
                    }
                }
            }
        }
    }

    info!(
        runs = summary.runs,
        failures = summary.failures,
        deleted = summary.deleted,
        "Retention scheduler stopped"
    );
    summary
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
