//! Incident storage: per-incident locks plus an entity index.

use parking_lot::Mutex;
use shared_types::{EntityId, Incident, IncidentId, IncidentState, IncidentView, Signal, SignalId};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// An incident together with its member signals.
///
/// Signals are kept alongside the incident so read-only views handed to the
/// Scorer and Federation are self-contained.
#[derive(Debug)]
pub struct IncidentRecord {
    pub incident: Incident,
    pub signals: BTreeMap<SignalId, Signal>,
}

impl IncidentRecord {
    pub fn open(id: IncidentId, signal: Signal) -> Self {
        let mut incident = Incident::open(id, &signal);
        incident
            .affected_entities
            .extend(super::signal_entities(&signal));
        let mut signals = BTreeMap::new();
        signals.insert(signal.id, signal);
        Self { incident, signals }
    }

    /// Attach one signal: members, entities, `last_seen`, version.
    ///
    /// Caller must hold the incident lock and have checked the state.
    pub fn attach(&mut self, signal: Signal) {
        self.incident.member_signal_ids.insert(signal.id);
        self.incident
            .affected_entities
            .extend(super::signal_entities(&signal));
        if signal.timestamp_ms > self.incident.last_seen_ms {
            self.incident.last_seen_ms = signal.timestamp_ms;
        }
        if signal.timestamp_ms < self.incident.first_seen_ms {
            self.incident.first_seen_ms = signal.timestamp_ms;
        }
        self.incident.member_version += 1;
        self.signals.insert(signal.id, signal);
    }

    /// Absorb another record's members during a merge.
    ///
    /// Caller holds both locks, acquired in ascending id order, and `other`
    /// is the higher id.
    pub fn absorb(&mut self, other: &mut IncidentRecord) {
        self.incident
            .member_signal_ids
            .append(&mut other.incident.member_signal_ids);
        let entities = std::mem::take(&mut other.incident.affected_entities);
        self.incident.affected_entities.extend(entities);
        self.incident.first_seen_ms = self.incident.first_seen_ms.min(other.incident.first_seen_ms);
        self.incident.last_seen_ms = self.incident.last_seen_ms.max(other.incident.last_seen_ms);
        self.incident.member_version += 1;
        self.signals.append(&mut other.signals);
        other.incident.state = IncidentState::MergedInto(self.incident.id);
    }

    /// Snapshot for downstream subsystems.
    pub fn to_view(&self) -> IncidentView {
        IncidentView {
            incident: self.incident.clone(),
            signals: self.signals.values().cloned().collect(),
        }
    }
}

/// Shared incident table.
///
/// Lock discipline: the table-level locks (`records`, `entity_index`) are
/// never held while an incident lock is taken. Incident locks are acquired
/// in ascending id order when more than one is needed.
pub struct IncidentTable {
    records: Mutex<HashMap<IncidentId, Arc<Mutex<IncidentRecord>>>>,
    entity_index: Mutex<HashMap<EntityId, BTreeSet<IncidentId>>>,
    closed_order: Mutex<VecDeque<IncidentId>>,
    next_id: AtomicU64,
    open_count: AtomicUsize,
    closed_count: AtomicU64,
    retention: usize,
}

impl IncidentTable {
    pub fn new(retention: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            entity_index: Mutex::new(HashMap::new()),
            closed_order: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            open_count: AtomicUsize::new(0),
            closed_count: AtomicU64::new(0),
            retention: retention.max(1),
        }
    }

    /// Allocate the next incident id (monotonic within the node).
    pub fn allocate_id(&self) -> IncidentId {
        IncidentId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a freshly opened incident and index its entities.
    pub fn insert(&self, record: IncidentRecord) -> Arc<Mutex<IncidentRecord>> {
        let id = record.incident.id;
        let entities: Vec<EntityId> = record.incident.affected_entities.iter().cloned().collect();
        let handle = Arc::new(Mutex::new(record));

        self.records.lock().insert(id, Arc::clone(&handle));
        let mut index = self.entity_index.lock();
        for entity in entities {
            index.entry(entity).or_default().insert(id);
        }
        drop(index);

        self.open_count.fetch_add(1, Ordering::Relaxed);
        handle
    }

    pub fn get(&self, id: IncidentId) -> Option<Arc<Mutex<IncidentRecord>>> {
        self.records.lock().get(&id).cloned()
    }

    /// Open incident ids currently indexed for an entity, ascending.
    pub fn candidates_for(&self, entity: &EntityId) -> Vec<IncidentId> {
        self.entity_index
            .lock()
            .get(entity)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// All open incident ids, ascending.
    pub fn open_ids(&self) -> Vec<IncidentId> {
        let mut ids: Vec<IncidentId> = self
            .entity_index
            .lock()
            .values()
            .flat_map(|set| set.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Add an entity → incident mapping (after an attach introduced a new
    /// entity).
    pub fn index_entity(&self, entity: EntityId, id: IncidentId) {
        self.entity_index.lock().entry(entity).or_default().insert(id);
    }

    /// Re-point all of an incident's entities at the merge survivor and
    /// drop the absorbed id from the index.
    pub fn reindex_after_merge(
        &self,
        absorbed: IncidentId,
        survivor: IncidentId,
        entities: &BTreeSet<EntityId>,
    ) {
        let mut index = self.entity_index.lock();
        for entity in entities {
            let set = index.entry(entity.clone()).or_default();
            set.remove(&absorbed);
            set.insert(survivor);
        }
        // The absorbed id may be indexed under entities the survivor did not
        // have yet; sweep the remainder.
        for set in index.values_mut() {
            set.remove(&absorbed);
        }
        drop(index);
        self.open_count.fetch_sub(1, Ordering::Relaxed);
    }

    /// Remove a closed incident from the entity index and retention-bound
    /// the closed set.
    pub fn record_closed(&self, id: IncidentId, entities: &BTreeSet<EntityId>) {
        let mut index = self.entity_index.lock();
        for entity in entities {
            if let Some(set) = index.get_mut(entity) {
                set.remove(&id);
                if set.is_empty() {
                    index.remove(entity);
                }
            }
        }
        drop(index);

        self.open_count.fetch_sub(1, Ordering::Relaxed);
        self.closed_count.fetch_add(1, Ordering::Relaxed);

        let mut order = self.closed_order.lock();
        order.push_back(id);
        while order.len() > self.retention {
            if let Some(evicted) = order.pop_front() {
                self.records.lock().remove(&evicted);
            }
        }
    }

    /// Drop an absorbed record after a merge (its members moved to the
    /// survivor; only the tombstone state remains relevant).
    pub fn remove_absorbed(&self, id: IncidentId) {
        self.records.lock().remove(&id);
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::Relaxed)
    }

    pub fn closed_count(&self) -> u64 {
        self.closed_count.load(Ordering::Relaxed)
    }
}
