//! Event store contracts and the `PostgreSQL` implementation.
//!
//! The store is a single shared collection of [`EventRecord`]s. It is only
//! ever queried by age ([`EventStore::delete_older_than`]) and by consumer
//! membership ([`ConsumerLog::pending_for`]); no other query shapes exist.
//!
//! Deletes are idempotent and commutative across nodes: any number of
//! sweepers may run the same cutoff rule concurrently against one table.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use herald_types::{EventId, EventRecord, NodeId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Storage contract used by producers and by the retention sweeper.
pub trait EventStore: Send + Sync {
    /// Append a new record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the storage layer rejects the write.
    fn insert(&self, record: &EventRecord) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Number of records currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the storage layer cannot be queried.
    fn count(&self) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Delete every record whose timestamp is strictly earlier than
    /// `cutoff`, compared at millisecond precision. Returns the number of
    /// records removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the delete fails. Nothing is retried.
    fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;
}

/// Consumption bookkeeping used by nodes that poll the shared store.
pub trait ConsumerLog: Send + Sync {
    /// Record that `node` has processed the record `id`.
    ///
    /// Appending is idempotent: a node already listed is not added twice.
    /// Returns `false` if the record no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the update fails.
    fn mark_consumed(
        &self,
        id: EventId,
        node: &NodeId,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Records `node` has not consumed yet, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    fn pending_for(
        &self,
        node: &NodeId,
    ) -> impl Future<Output = Result<Vec<EventRecord>, DbError>> + Send;
}

impl<S: EventStore> EventStore for Arc<S> {
    fn insert(&self, record: &EventRecord) -> impl Future<Output = Result<(), DbError>> + Send {
        (**self).insert(record)
    }

    fn count(&self) -> impl Future<Output = Result<u64, DbError>> + Send {
        (**self).count()
    }

    fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send {
        (**self).delete_older_than(cutoff)
    }
}

/// [`EventStore`] backed by the `cluster_events` table.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Create a new event store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EventStore for PgEventStore {
    async fn insert(&self, record: &EventRecord) -> Result<(), DbError> {
        let consumers: Vec<String> = record
            .consumers
            .iter()
            .map(|node| node.as_str().to_owned())
            .collect();

        sqlx::query(
            r"INSERT INTO cluster_events (id, timestamp, producer, consumers, event_class, payload)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id.into_inner())
        .bind(record.timestamp_millis())
        .bind(record.producer.as_str())
        .bind(&consumers)
        .bind(&record.event_class)
        .bind(&record.payload)
        .execute(&self.pool)
        .await?;

        tracing::trace!(id = %record.id, producer = %record.producer, "Inserted cluster event");
        Ok(())
    }

    async fn count(&self) -> Result<u64, DbError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cluster_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM cluster_events WHERE timestamp < $1")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            cutoff_ms = cutoff.timestamp_millis(),
            deleted = result.rows_affected(),
            "Deleted expired cluster events"
        );
        Ok(result.rows_affected())
    }
}

impl ConsumerLog for PgEventStore {
    async fn mark_consumed(&self, id: EventId, node: &NodeId) -> Result<bool, DbError> {
        let updated = sqlx::query(
            r"UPDATE cluster_events
              SET consumers = array_append(consumers, $2)
              WHERE id = $1 AND NOT ($2 = ANY(consumers))",
        )
        .bind(id.into_inner())
        .bind(node.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() > 0 {
            return Ok(true);
        }

        // Either already listed or gone.
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM cluster_events WHERE id = $1)")
                .bind(id.into_inner())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn pending_for(&self, node: &NodeId) -> Result<Vec<EventRecord>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT id, timestamp, producer, consumers, event_class, payload
              FROM cluster_events
              WHERE NOT ($1 = ANY(consumers))
              ORDER BY timestamp, id",
        )
        .bind(node.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EventRecord::try_from).collect()
    }
}

/// A row from the `cluster_events` table.
///
/// Uses runtime types rather than compile-time checked types to
/// avoid requiring a live database during builds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Record ID.
    pub id: Uuid,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Producing node.
    pub producer: String,
    /// Nodes that processed the record.
    pub consumers: Vec<String>,
    /// Payload type tag.
    pub event_class: String,
    /// Opaque payload.
    pub payload: serde_json::Value,
}

impl TryFrom<EventRow> for EventRecord {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let timestamp =
            DateTime::from_timestamp_millis(row.timestamp).ok_or_else(|| DbError::MalformedRow {
                id: row.id,
                reason: format!("timestamp {} out of range", row.timestamp),
            })?;

        Ok(Self {
            id: EventId::from(row.id),
            timestamp,
            producer: NodeId::from(row.producer),
            consumers: row.consumers.into_iter().map(NodeId::from).collect(),
            event_class: row.event_class,
            payload: row.payload,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(timestamp: i64) -> EventRow {
        EventRow {
            id: Uuid::now_v7(),
            timestamp,
            producer: "node-a".to_owned(),
            consumers: vec!["node-b".to_owned()],
            event_class: "com.example.Notice".to_owned(),
            payload: json!({"message": "hello"}),
        }
    }

    #[test]
    fn row_converts_to_record() {
        let row = row(1_427_846_400_000);
        let id = row.id;
        let record = EventRecord::try_from(row).unwrap();
        assert_eq!(record.id.into_inner(), id);
        assert_eq!(record.timestamp_millis(), 1_427_846_400_000);
        assert_eq!(record.producer.as_str(), "node-a");
        assert!(record.is_consumed_by(&NodeId::new("node-b")));
    }

    #[test]
    fn out_of_range_timestamp_is_malformed() {
        let result = EventRecord::try_from(row(i64::MAX));
        assert!(matches!(result, Err(DbError::MalformedRow { .. })));
    }
}
