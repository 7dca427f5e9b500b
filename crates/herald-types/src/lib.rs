//! Shared type definitions for the Herald cluster event bus.
//!
//! Every node in a cluster publishes [`EventRecord`]s into one shared
//! collection so the other nodes can observe them. This crate holds the
//! record schema and the identifiers it references. It has no I/O.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers ([`EventId`], [`NodeId`])
//! - [`record`] -- The [`EventRecord`] stored in the shared event store

pub mod ids;
pub mod record;

pub use ids::{EventId, NodeId};
pub use record::{EventRecord, truncate_to_millis};
