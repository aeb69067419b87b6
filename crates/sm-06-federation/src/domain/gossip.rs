//! Gossip mechanics: message deduplication and bounded random fanout.

use parking_lot::RwLock;
use rand::seq::SliceRandom;
use shared_types::NodeId;
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

/// Bounded cache of gossip message ids already processed.
///
/// A node forwards a given message id at most once; duplicates arriving
/// over other gossip paths are ignored.
pub struct SeenMessageCache {
    seen: RwLock<HashSet<Uuid>>,
    insertion_order: RwLock<VecDeque<Uuid>>,
    max_size: usize,
}

impl SeenMessageCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            seen: RwLock::new(HashSet::with_capacity(max_size)),
            insertion_order: RwLock::new(VecDeque::with_capacity(max_size)),
            max_size: max_size.max(1),
        }
    }

    pub fn has_seen(&self, id: &Uuid) -> bool {
        self.seen.read().contains(id)
    }

    /// Mark a message id as seen. Returns `false` if it already was.
    pub fn mark_seen(&self, id: Uuid) -> bool {
        let mut seen = self.seen.write();
        let mut order = self.insertion_order.write();

        if !seen.insert(id) {
            return false;
        }
        order.push_back(id);
        while seen.len() > self.max_size {
            if let Some(oldest) = order.pop_front() {
                seen.remove(&oldest);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.seen.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.read().is_empty()
    }
}

/// Pick a bounded random subset of peers to forward to, excluding the
/// message origin (eventual, not total, propagation).
pub fn select_gossip_peers(
    peers: &[NodeId],
    fanout: usize,
    exclude: Option<NodeId>,
) -> Vec<NodeId> {
    let eligible: Vec<NodeId> = peers
        .iter()
        .copied()
        .filter(|peer| Some(*peer) != exclude)
        .collect();

    let mut rng = rand::thread_rng();
    eligible
        .choose_multiple(&mut rng, fanout.min(eligible.len()))
        .copied()
        .collect()
}
