//! The event record broadcast through the shared event store.
//!
//! A record is written once by its producer. Consumers append their node
//! ID to [`EventRecord::consumers`] after processing it. The retention
//! sweeper reads nothing but [`EventRecord::timestamp`].
//!
//! Timestamps travel as integer milliseconds since the Unix epoch (UTC).
//! Constructors truncate to millisecond precision so that comparisons made
//! in process agree with comparisons made against the stored integer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, NodeId};

/// A single cluster-wide event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Storage identifier.
    pub id: EventId,
    /// When the producer created the event. Never modified after creation.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Node or component that created the event.
    pub producer: NodeId,
    /// Nodes that have already processed the event, in processing order.
    #[serde(default)]
    pub consumers: Vec<NodeId>,
    /// Type tag telling consumers how to interpret `payload`.
    pub event_class: String,
    /// Opaque serialized content.
    pub payload: serde_json::Value,
}

impl EventRecord {
    /// Create a record that no node has consumed yet.
    pub fn new(
        producer: impl Into<NodeId>,
        event_class: impl Into<String>,
        payload: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            timestamp: truncate_to_millis(timestamp),
            producer: producer.into(),
            consumers: Vec::new(),
            event_class: event_class.into(),
            payload,
        }
    }

    /// Create a record stamped with an explicit millisecond timestamp.
    ///
    /// Returns `None` if `millis` is outside the range `chrono` can represent.
    pub fn at_millis(
        producer: impl Into<NodeId>,
        event_class: impl Into<String>,
        payload: serde_json::Value,
        millis: i64,
    ) -> Option<Self> {
        let timestamp = DateTime::from_timestamp_millis(millis)?;
        Some(Self::new(producer, event_class, payload, timestamp))
    }

    /// The record's timestamp as milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Whether `node` has already processed this record.
    pub fn is_consumed_by(&self, node: &NodeId) -> bool {
        self.consumers.contains(node)
    }
}

/// Drop sub-millisecond precision from an instant.
pub fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(instant.timestamp_millis()).unwrap_or(instant)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_form_uses_stable_field_names() {
        let record = EventRecord::at_millis(
            "node-a",
            "com.example.IndexRotated",
            json!("Test1427846400000"),
            1_427_846_400_000,
        )
        .unwrap();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["timestamp"], json!(1_427_846_400_000_i64));
        assert_eq!(value["producer"], json!("node-a"));
        assert_eq!(value["consumers"], json!([]));
        assert_eq!(value["event_class"], json!("com.example.IndexRotated"));
        assert_eq!(value["payload"], json!("Test1427846400000"));
    }

    #[test]
    fn missing_consumers_deserializes_as_empty() {
        let raw = json!({
            "id": "01890a5d-ac96-774b-bcce-b302099a8057",
            "timestamp": 0,
            "producer": "node-a",
            "event_class": "com.example.Notice",
            "payload": "Test0",
        });
        let record: EventRecord = serde_json::from_value(raw).unwrap();
        assert!(record.consumers.is_empty());
        assert_eq!(record.timestamp_millis(), 0);
    }

    #[test]
    fn constructor_truncates_to_milliseconds() {
        let instant = Utc
            .with_ymd_and_hms(2015, 4, 1, 0, 0, 0)
            .unwrap()
            .checked_add_signed(chrono::TimeDelta::microseconds(1_500))
            .unwrap();
        let record = EventRecord::new("node-a", "x", json!(null), instant);
        assert_eq!(record.timestamp_millis(), 1_427_846_400_001);
        assert_eq!(record.timestamp.timestamp_subsec_nanos(), 1_000_000);
    }

    #[test]
    fn consumed_by_checks_membership() {
        let mut record = EventRecord::at_millis("node-a", "x", json!({}), 5).unwrap();
        let node_b = NodeId::new("node-b");
        assert!(!record.is_consumed_by(&node_b));
        record.consumers.push(node_b.clone());
        assert!(record.is_consumed_by(&node_b));
    }
}
