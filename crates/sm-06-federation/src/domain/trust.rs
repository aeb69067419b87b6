//! Per-peer trust counters.
//!
//! Verification failures decrement trust. The core attaches no automated
//! exile logic to the counter; it exists for operator visibility and for
//! outer layers to act on.

use parking_lot::RwLock;
use shared_types::NodeId;
use std::collections::HashMap;

/// Initial trust assigned to a newly registered peer.
const INITIAL_TRUST: i64 = 0;

#[derive(Default)]
pub struct TrustLedger {
    counters: RwLock<HashMap<NodeId, i64>>,
}

impl TrustLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, peer: NodeId) {
        self.counters.write().entry(peer).or_insert(INITIAL_TRUST);
    }

    /// Decrement a peer's trust (verification failure).
    pub fn decrement(&self, peer: NodeId) -> i64 {
        let mut counters = self.counters.write();
        let counter = counters.entry(peer).or_insert(INITIAL_TRUST);
        *counter -= 1;
        *counter
    }

    pub fn trust_of(&self, peer: &NodeId) -> i64 {
        self.counters
            .read()
            .get(peer)
            .copied()
            .unwrap_or(INITIAL_TRUST)
    }

    pub fn snapshot(&self) -> HashMap<NodeId, i64> {
        self.counters.read().clone()
    }
}
