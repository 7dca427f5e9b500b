//! Retention enforcement for the Herald cluster event bus.
//!
//! The shared event store is append-only from the producers' side. Without
//! a backstop it grows forever whenever a node leaves the cluster before
//! consuming everything. This crate provides that backstop: a stateless
//! [`RetentionSweeper`] that deletes every record older than the configured
//! maximum age, and a [`scheduler`] that runs it on a fixed cadence.
//!
//! # Modules
//!
//! - [`clock`] -- Injectable time source
//! - [`config`] -- YAML configuration with environment overrides
//! - [`sweeper`] -- Cutoff arithmetic and the sweep itself
//! - [`scheduler`] -- Periodic invocation with shutdown support

pub mod clock;
pub mod config;
pub mod scheduler;
pub mod sweeper;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, HeraldConfig, RetentionConfig};
pub use scheduler::{Schedule, SchedulerSummary, run_periodically};
pub use sweeper::{
    DEFAULT_MAX_EVENT_AGE, RetentionSweeper, SweepError, SweepReport, is_representable_age,
};
