//! Type-safe identifiers for records and cluster nodes.
//!
//! Record IDs use UUID v7 (time-ordered) so a btree index on the ID column
//! stays append-friendly. Node IDs are free-form strings chosen by the
//! deployment (hostnames, pod names, generated UUIDs).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a stored event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<EventId> for Uuid {
    fn from(id: EventId) -> Self {
        id.0
    }
}

/// Identifier of a cluster node acting as producer or consumer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap a node name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the node name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the owned node name.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn event_ids_use_uuid_v7() {
        let id = EventId::new();
        assert_eq!(id.into_inner().get_version_num(), 7);
    }

    #[test]
    fn node_id_serializes_as_plain_string() {
        let node = NodeId::new("node-a");
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, "\"node-a\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
