//! Per-entity buffering and signal deduplication.

use parking_lot::{Mutex, RwLock};
use shared_types::{EntityId, Signal, SignalId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Bounded cache of signal ids already ingested (deduplication).
///
/// Insertion-order eviction: when the cache is full, the oldest remembered
/// id is forgotten first.
pub struct SeenSignalCache {
    seen: RwLock<HashSet<SignalId>>,
    insertion_order: RwLock<VecDeque<SignalId>>,
    max_size: usize,
}

impl SeenSignalCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            seen: RwLock::new(HashSet::with_capacity(max_size)),
            insertion_order: RwLock::new(VecDeque::with_capacity(max_size)),
            max_size,
        }
    }

    /// Check if a signal id has been seen.
    pub fn has_seen(&self, id: &SignalId) -> bool {
        self.seen.read().contains(id)
    }

    /// Mark a signal id as seen, evicting the oldest entry at capacity.
    pub fn mark_seen(&self, id: SignalId) {
        let mut seen = self.seen.write();
        let mut order = self.insertion_order.write();

        if seen.contains(&id) {
            return;
        }

        if seen.len() >= self.max_size {
            if let Some(oldest) = order.pop_front() {
                seen.remove(&oldest);
            }
        }

        seen.insert(id);
        order.push_back(id);
    }

    pub fn len(&self) -> usize {
        self.seen.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.read().is_empty()
    }
}

/// A signal dropped by backpressure, with the entity's running drop count.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedSignal {
    pub signal: Signal,
    pub total_dropped: u64,
}

/// Per-entity bounded FIFO buffers.
///
/// One queue per source entity preserves arrival order within that entity;
/// queues for different entities are independent.
pub struct EntityBuffers {
    queues: Mutex<HashMap<EntityId, VecDeque<Signal>>>,
    drop_counts: Mutex<HashMap<EntityId, u64>>,
    max_per_entity: usize,
}

impl EntityBuffers {
    pub fn new(max_per_entity: usize) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            drop_counts: Mutex::new(HashMap::new()),
            max_per_entity: max_per_entity.max(1),
        }
    }

    /// Enqueue a signal for its entity.
    ///
    /// Returns the oldest signal of the same entity if the bound forced a
    /// drop, together with the entity's updated drop counter.
    pub fn push(&self, signal: Signal) -> Option<DroppedSignal> {
        let entity = signal.source_entity.clone();
        let mut queues = self.queues.lock();
        let queue = queues.entry(entity.clone()).or_default();

        let dropped = if queue.len() >= self.max_per_entity {
            queue.pop_front()
        } else {
            None
        };
        queue.push_back(signal);
        drop(queues);

        dropped.map(|signal| {
            let mut counts = self.drop_counts.lock();
            let count = counts.entry(entity).or_insert(0);
            *count += 1;
            DroppedSignal {
                signal,
                total_dropped: *count,
            }
        })
    }

    /// Drain every queue, preserving per-entity FIFO order.
    pub fn drain_all(&self) -> Vec<Signal> {
        let mut queues = self.queues.lock();
        let mut drained = Vec::new();
        for queue in queues.values_mut() {
            drained.extend(queue.drain(..));
        }
        drained
    }

    /// Total signals currently buffered.
    pub fn len(&self) -> usize {
        self.queues.lock().values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Running drop count for an entity.
    pub fn dropped_for(&self, entity: &EntityId) -> u64 {
        self.drop_counts.lock().get(entity).copied().unwrap_or(0)
    }
}
