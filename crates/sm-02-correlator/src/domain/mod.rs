//! Domain logic for incident correlation.

mod table;
mod window;

pub use table::{IncidentRecord, IncidentTable};
pub use window::within_window;

use shared_types::{EntityId, Signal};

/// Attribute naming the other endpoint of an observed interaction.
///
/// Sensors that see both ends of a flow set this; the incident then spans
/// both entities, which is what lets one signal bridge (and merge) two open
/// incidents.
pub const PEER_ENTITY_ATTR: &str = "peer_entity";

/// The entities a signal refers to: its source entity plus an optional
/// peer entity from the attributes.
pub fn signal_entities(signal: &Signal) -> Vec<EntityId> {
    let mut entities = vec![signal.source_entity.clone()];
    if let Some(peer) = signal.attributes.get(PEER_ENTITY_ATTR) {
        let peer = peer.trim();
        if !peer.is_empty() && peer != signal.source_entity.as_str() {
            entities.push(EntityId::new(peer));
        }
    }
    entities
}

/// Correlator configuration.
#[derive(Clone, Debug)]
pub struct CorrelationConfig {
    /// Sliding window W: a signal attaches to an open incident when its
    /// timestamp is within W of the incident's `last_seen`.
    pub window_ms: u64,
    /// How many closed incidents to retain for status queries before the
    /// oldest are forgotten.
    pub closed_retention: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            window_ms: 30_000,
            closed_retention: 10_000,
        }
    }
}

/// Correlator counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CorrelatorStats {
    pub open_incidents: usize,
    pub closed_incidents: u64,
    pub merges: u64,
}
