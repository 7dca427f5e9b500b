//! In-process event store.
//!
//! Mirrors [`PgEventStore`](crate::PgEventStore) semantics exactly,
//! including millisecond-precision timestamp comparison, so tests and
//! single-node deployments can run without a database. Every operation
//! takes the lock once, so inserts, consumer updates, and deletes are
//! linearizable with respect to each other.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use herald_types::{EventId, EventRecord, NodeId};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::event_store::{ConsumerLog, EventStore};

/// [`EventStore`] holding records in a lock-protected map.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    records: RwLock<BTreeMap<EventId, EventRecord>>,
}

impl MemoryEventStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record, ordered by ID.
    pub async fn records(&self) -> Vec<EventRecord> {
        self.records.read().await.values().cloned().collect()
    }
}

impl EventStore for MemoryEventStore {
    async fn insert(&self, record: &EventRecord) -> Result<(), DbError> {
        let mut records = self.records.write().await;
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn count(&self) -> Result<u64, DbError> {
        let len = self.records.read().await.len();
        Ok(u64::try_from(len).unwrap_or(u64::MAX))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let cutoff_ms = cutoff.timestamp_millis();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| record.timestamp_millis() >= cutoff_ms);
        let deleted = before.saturating_sub(records.len());
        drop(records);

        tracing::debug!(cutoff_ms, deleted, "Deleted expired in-memory events");
        Ok(u64::try_from(deleted).unwrap_or(u64::MAX))
    }
}

impl ConsumerLog for MemoryEventStore {
    async fn mark_consumed(&self, id: EventId, node: &NodeId) -> Result<bool, DbError> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return Ok(false);
        };
        if !record.is_consumed_by(node) {
            record.consumers.push(node.clone());
        }
        Ok(true)
    }

    async fn pending_for(&self, node: &NodeId) -> Result<Vec<EventRecord>, DbError> {
        let records = self.records.read().await;
        let mut pending: Vec<EventRecord> = records
            .values()
            .filter(|record| !record.is_consumed_by(node))
            .cloned()
            .collect();
        drop(records);

        pending.sort_by(|a, b| {
            a.timestamp_millis()
                .cmp(&b.timestamp_millis())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(pending)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::sync::Barrier;

    use super::*;

    fn record_at(millis: i64) -> EventRecord {
        EventRecord::at_millis("node-a", "com.example.Notice", json!(format!("Test{millis}")), millis)
            .unwrap()
    }

    fn instant(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[tokio::test]
    async fn delete_is_strictly_less_than_cutoff() {
        let store = MemoryEventStore::new();
        for millis in [999, 1_000, 1_001] {
            store.insert(&record_at(millis)).await.unwrap();
        }

        let deleted = store.delete_older_than(instant(1_000)).await.unwrap();

        assert_eq!(deleted, 1);
        let remaining: Vec<i64> = store
            .records()
            .await
            .iter()
            .map(EventRecord::timestamp_millis)
            .collect();
        assert_eq!(remaining, vec![1_000, 1_001]);
    }

    #[tokio::test]
    async fn cutoff_is_compared_at_millisecond_precision() {
        let store = MemoryEventStore::new();
        store.insert(&record_at(1_000)).await.unwrap();

        let cutoff = instant(1_000)
            .checked_add_signed(chrono::TimeDelta::microseconds(900))
            .unwrap();
        let deleted = store.delete_older_than(cutoff).await.unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_on_empty_store_is_a_no_op() {
        let store = MemoryEventStore::new();
        assert_eq!(store.delete_older_than(instant(0)).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_consumed_is_idempotent() {
        let store = MemoryEventStore::new();
        let record = record_at(10);
        store.insert(&record).await.unwrap();
        let node = NodeId::new("node-b");

        assert!(store.mark_consumed(record.id, &node).await.unwrap());
        assert!(store.mark_consumed(record.id, &node).await.unwrap());

        let stored = store.records().await;
        assert_eq!(stored[0].consumers, vec![node]);
    }

    #[tokio::test]
    async fn mark_consumed_on_deleted_record_reports_missing() {
        let store = MemoryEventStore::new();
        let record = record_at(10);
        store.insert(&record).await.unwrap();
        store.delete_older_than(instant(11)).await.unwrap();

        let found = store
            .mark_consumed(record.id, &NodeId::new("node-b"))
            .await
            .unwrap();
        assert!(!found);
    }

    #[tokio::test]
    async fn pending_for_skips_consumed_and_orders_by_age() {
        let store = MemoryEventStore::new();
        let newer = record_at(20);
        let older = record_at(10);
        let consumed = record_at(5);
        for record in [&newer, &older, &consumed] {
            store.insert(record).await.unwrap();
        }
        let node = NodeId::new("node-b");
        store.mark_consumed(consumed.id, &node).await.unwrap();

        let pending = store.pending_for(&node).await.unwrap();
        let ids: Vec<EventId> = pending.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);

        let other = store.pending_for(&NodeId::new("node-c")).await.unwrap();
        assert_eq!(other.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_inserts_newer_than_cutoff_survive() {
        let store = Arc::new(MemoryEventStore::new());
        for millis in 0..50 {
            store.insert(&record_at(millis)).await.unwrap();
        }
        let barrier = Arc::new(Barrier::new(2));

        let writer = {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                for millis in 1_000..1_050 {
                    store.insert(&record_at(millis)).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };
        let sweeper = {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                let mut deleted = 0;
                for _ in 0..10 {
                    deleted += store.delete_older_than(instant(100)).await.unwrap();
                    tokio::task::yield_now().await;
                }
                deleted
            })
        };
        writer.await.unwrap();
        let deleted = sweeper.await.unwrap();

        assert_eq!(deleted, 50);
        assert_eq!(store.count().await.unwrap(), 50);
        assert!(
            store
                .records()
                .await
                .iter()
                .all(|r| r.timestamp_millis() >= 1_000)
        );
    }
}
