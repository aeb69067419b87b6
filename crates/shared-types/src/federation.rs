//! # Federation Types
//!
//! Message types exchanged between peer defense nodes.
//!
//! ## Privacy Boundary
//!
//! Federation messages carry incident *digests* and aggregate statistics
//! only. Raw sensor signals never cross the node boundary.

use crate::entities::{EntityId, IncidentId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Identity of a peer defense node (Ed25519 verifying key bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short prefix is enough for log lines.
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Summary of one closed incident, safe to share with peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentDigest {
    pub incident_id: IncidentId,
    pub affected_entities: BTreeSet<EntityId>,
    /// Final severity at close time.
    pub severity: f64,
    /// Signal counts keyed by kind label.
    pub kind_counts: BTreeMap<String, u32>,
    pub closed_at_ms: u64,
}

/// Aggregate score statistics for a broadcast interval.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub incidents_closed: u64,
    pub mean_severity: f64,
    pub max_severity: f64,
}

/// The signed portion of a federation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationPayload {
    /// Gossip deduplication key.
    pub message_id: Uuid,
    /// Originating node.
    pub node_id: NodeId,
    pub digests: Vec<IncidentDigest>,
    pub score_summary: ScoreSummary,
}

impl FederationPayload {
    /// Canonical bytes covered by the signature.
    pub fn signable_bytes(&self) -> Result<Vec<u8>, crate::errors::FederationError> {
        bincode::serialize(self)
            .map_err(|e| crate::errors::FederationError::Encoding(e.to_string()))
    }
}

/// A signed gossip message exchanged between defense nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationMessage {
    pub payload: FederationPayload,
    /// Ed25519 signature over [`FederationPayload::signable_bytes`].
    pub signature: Vec<u8>,
}

impl FederationMessage {
    pub fn message_id(&self) -> Uuid {
        self.payload.message_id
    }

    pub fn origin(&self) -> NodeId {
        self.payload.node_id
    }
}
