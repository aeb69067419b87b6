//! Score cache keyed by `(incident, member_version)`.

use parking_lot::Mutex;
use shared_types::{IncidentId, ThreatScore};
use std::collections::{HashMap, VecDeque};

/// Bounded score cache.
///
/// A hit requires the cached entry's member version to match; any member-set
/// mutation (version bump) misses and recomputes. Insertion-order eviction
/// bounds memory.
pub struct ScoreCache {
    entries: Mutex<HashMap<IncidentId, ThreatScore>>,
    insertion_order: Mutex<VecDeque<IncidentId>>,
    max_size: usize,
}

impl ScoreCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(max_size)),
            insertion_order: Mutex::new(VecDeque::new()),
            max_size: max_size.max(1),
        }
    }

    /// Cached score for the exact member version, if any.
    pub fn get(&self, incident_id: IncidentId, member_version: u64) -> Option<ThreatScore> {
        self.entries
            .lock()
            .get(&incident_id)
            .filter(|score| score.member_version == member_version)
            .cloned()
    }

    /// Insert or replace the cached score for an incident.
    pub fn insert(&self, score: ThreatScore) {
        let id = score.incident_id;
        let mut entries = self.entries.lock();
        let mut order = self.insertion_order.lock();

        if entries.insert(id, score).is_none() {
            order.push_back(id);
            while entries.len() > self.max_size {
                if let Some(evicted) = order.pop_front() {
                    entries.remove(&evicted);
                }
            }
        }
    }

    /// Drop the entry for a closed incident.
    pub fn purge(&self, incident_id: IncidentId) {
        self.entries.lock().remove(&incident_id);
        self.insertion_order.lock().retain(|id| *id != incident_id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
