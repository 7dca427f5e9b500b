//! Data layer for the Herald cluster event bus.
//!
//! All cluster nodes share one `cluster_events` collection. Producers
//! insert records, consumers append their node ID once they have processed
//! a record, and the retention sweeper physically deletes records that
//! aged out of the retention window.
//!
//! # Architecture
//!
//! ```text
//! Producer ----- insert ------------+
//!                                   |
//! Consumer ----- mark_consumed -----+--> EventStore / ConsumerLog
//!                pending_for        |      |-- PgEventStore     (PostgreSQL)
//!                                   |      +-- MemoryEventStore (in process)
//! Sweeper ------ delete_older_than -+
//! ```
//!
//! # Modules
//!
//! - [`event_store`] -- Store contracts and the `PostgreSQL` implementation
//! - [`memory`] -- In-process implementation with identical semantics
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`error`] -- Shared error types

pub mod error;
pub mod event_store;
pub mod memory;
pub mod postgres;

// Re-export primary types for convenience.
pub use error::DbError;
pub use event_store::{ConsumerLog, EventRow, EventStore, PgEventStore};
pub use memory::MemoryEventStore;
pub use postgres::{PostgresConfig, PostgresPool};
