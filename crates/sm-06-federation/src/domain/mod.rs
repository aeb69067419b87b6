//! Domain logic for federation gossip.

mod gossip;
mod intel;
mod trust;

pub use gossip::{select_gossip_peers, SeenMessageCache};
pub use intel::PeerIntelStore;
pub use trust::TrustLedger;

/// Federation configuration.
#[derive(Clone, Debug)]
pub struct FederationConfig {
    /// Peers to gossip each message to.
    pub fanout: usize,
    /// Seen-message cache size (gossip deduplication).
    pub seen_cache_size: usize,
    /// How long a peer digest contributes to corroboration.
    pub intel_window_ms: u64,
    /// Corroboration added per distinct corroborating peer (capped at 1.0).
    pub corroboration_per_node: f64,
    /// Maximum digests carried by one message.
    pub max_digests_per_message: usize,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            fanout: 4,
            seen_cache_size: 10_000,
            intel_window_ms: 30 * 60 * 1_000,
            corroboration_per_node: 0.25,
            max_digests_per_message: 64,
        }
    }
}

/// Federation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FederationStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub messages_rejected: u64,
    pub known_peers: usize,
}
