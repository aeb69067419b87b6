//! Peer intelligence store: verified digests feeding score corroboration.

use parking_lot::RwLock;
use shared_types::{EntityId, IncidentDigest, NodeId};
use std::collections::{BTreeSet, HashMap, HashSet};

/// One stored peer report.
#[derive(Clone, Debug)]
struct IntelEntry {
    origin: NodeId,
    received_at_ms: u64,
}

/// Verified peer digests, indexed by entity.
///
/// Cross-node corroboration raises a Scorer feature; it never overrides a
/// local score. Entries age out of the corroboration window lazily.
pub struct PeerIntelStore {
    by_entity: RwLock<HashMap<EntityId, Vec<IntelEntry>>>,
    window_ms: u64,
    per_node_weight: f64,
}

impl PeerIntelStore {
    pub fn new(window_ms: u64, per_node_weight: f64) -> Self {
        Self {
            by_entity: RwLock::new(HashMap::new()),
            window_ms,
            per_node_weight,
        }
    }

    /// Store a verified digest.
    pub fn store(&self, origin: NodeId, digest: &IncidentDigest, now_ms: u64) {
        let mut index = self.by_entity.write();
        for entity in &digest.affected_entities {
            let entries = index.entry(entity.clone()).or_default();
            entries.push(IntelEntry {
                origin,
                received_at_ms: now_ms,
            });
            let cutoff = now_ms.saturating_sub(self.window_ms);
            entries.retain(|e| e.received_at_ms >= cutoff);
        }
    }

    /// Corroboration strength in [0, 1] for a set of entities: distinct
    /// peer nodes that recently reported any overlapping entity.
    pub fn corroboration_for(&self, entities: &BTreeSet<EntityId>, now_ms: u64) -> f64 {
        let cutoff = now_ms.saturating_sub(self.window_ms);
        let index = self.by_entity.read();

        let mut nodes: HashSet<NodeId> = HashSet::new();
        for entity in entities {
            if let Some(entries) = index.get(entity) {
                for entry in entries {
                    if entry.received_at_ms >= cutoff {
                        nodes.insert(entry.origin);
                    }
                }
            }
        }

        (nodes.len() as f64 * self.per_node_weight).clamp(0.0, 1.0)
    }

    /// Entities currently tracked.
    pub fn entity_count(&self) -> usize {
        self.by_entity.read().len()
    }
}
