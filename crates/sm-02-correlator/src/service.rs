//! # Correlator Service
//!
//! Implements [`CorrelatorApi`]: window-based attachment, deterministic
//! lower-id-wins merging, and inactivity close.
//!
//! ## Lock Discipline
//!
//! - Table-level locks (record map, entity index) are never held while an
//!   incident lock is taken.
//! - When a signal touches several open incidents, their locks are acquired
//!   in ascending id order; merge-of-merges therefore cannot deadlock.
//! - Candidate state is re-validated under the incident locks; if a
//!   concurrent merge or close invalidated a candidate, the whole selection
//!   retries against the updated index.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::domain::{
    signal_entities, within_window, CorrelationConfig, CorrelatorStats, IncidentRecord,
    IncidentTable,
};
use crate::ports::inbound::CorrelatorApi;
use crate::ports::outbound::CorrelationEventSink;
use shared_types::{
    CorrelationError, IncidentId, IncidentState, IncidentView, Signal,
};

/// Correlator service.
///
/// Thread-safe; shared across ingestion tasks via `Arc`.
pub struct CorrelatorService<E>
where
    E: CorrelationEventSink,
{
    config: CorrelationConfig,
    table: IncidentTable,
    events: Arc<E>,
    merges: AtomicU64,
}

impl<E> CorrelatorService<E>
where
    E: CorrelationEventSink,
{
    pub fn new(config: CorrelationConfig, events: Arc<E>) -> Self {
        Self {
            table: IncidentTable::new(config.closed_retention),
            config,
            events,
            merges: AtomicU64::new(0),
        }
    }

    /// Candidate open incidents for a signal: every incident indexed under
    /// any of the signal's entities, ascending by id.
    fn candidates(&self, signal: &Signal) -> Vec<IncidentId> {
        let mut ids: Vec<IncidentId> = signal_entities(signal)
            .iter()
            .flat_map(|entity| self.table.candidates_for(entity))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Open a fresh incident for a signal.
    fn open_incident(&self, signal: Signal) -> IncidentId {
        let id = self.table.allocate_id();
        let entity = signal.source_entity.clone();
        let record = IncidentRecord::open(id, signal);
        let view = record.to_view();
        self.table.insert(record);

        self.events.incident_opened(id, &entity);
        self.events.incident_updated(view);
        debug!(incident = %id, entity = %entity, "Incident opened");
        id
    }
}

impl<E> CorrelatorApi for CorrelatorService<E>
where
    E: CorrelationEventSink,
{
    fn handle_signal(&self, signal: Signal) -> IncidentId {
        loop {
            let candidate_ids = self.candidates(&signal);

            if candidate_ids.is_empty() {
                return self.open_incident(signal);
            }

            // Collect handles first, then lock in ascending id order.
            let handles: Vec<(IncidentId, Arc<Mutex<IncidentRecord>>)> = candidate_ids
                .iter()
                .filter_map(|id| self.table.get(*id).map(|h| (*id, h)))
                .collect();

            if handles.len() != candidate_ids.len() {
                // A candidate vanished between index read and lookup; the
                // index has moved on, re-select.
                continue;
            }

            let mut guards: Vec<(IncidentId, MutexGuard<'_, IncidentRecord>)> = Vec::new();
            let mut stale = false;
            for (id, handle) in &handles {
                let guard = handle.lock();
                if guard.incident.state != IncidentState::Open {
                    stale = true;
                    break;
                }
                guards.push((*id, guard));
            }
            if stale {
                drop(guards);
                continue;
            }

            // Keep only candidates whose window still covers the signal.
            let in_window: Vec<usize> = guards
                .iter()
                .enumerate()
                .filter(|(_, (_, g))| {
                    within_window(
                        signal.timestamp_ms,
                        g.incident.last_seen_ms,
                        self.config.window_ms,
                    )
                })
                .map(|(i, _)| i)
                .collect();

            if in_window.is_empty() {
                drop(guards);
                return self.open_incident(signal);
            }

            if in_window.len() == 1 {
                let idx = in_window[0];
                let (id, guard) = &mut guards[idx];
                let id = *id;
                guard.attach(signal.clone());
                let view = guard.to_view();
                drop(guards);

                for entity in signal_entities(&signal) {
                    self.table.index_entity(entity, id);
                }
                self.events.incident_updated(view);
                debug!(incident = %id, signal = %signal.id, "Signal attached");
                return id;
            }

            // Merge: lowest id survives. Guards are already in ascending id
            // order, so the survivor is the first in-window guard.
            let survivor_idx = in_window[0];
            let survivor_id = guards[survivor_idx].0;
            let mut absorbed = Vec::new();

            // Move the higher-id records' members into the survivor. Split
            // borrows via index arithmetic: survivor_idx is strictly the
            // smallest index in `in_window`.
            for &idx in &in_window[1..] {
                let (left, right) = guards.split_at_mut(idx);
                let survivor = &mut left[survivor_idx].1;
                let (absorbed_id, other) = &mut right[0];
                let entities = other.incident.affected_entities.clone();
                survivor.absorb(other);
                absorbed.push((*absorbed_id, entities));
            }

            let survivor = &mut guards[survivor_idx].1;
            survivor.attach(signal.clone());
            let view = survivor.to_view();
            drop(guards);

            for (absorbed_id, entities) in &absorbed {
                self.table
                    .reindex_after_merge(*absorbed_id, survivor_id, entities);
                self.table.remove_absorbed(*absorbed_id);
                self.merges.fetch_add(1, Ordering::Relaxed);
                self.events.incidents_merged(survivor_id, *absorbed_id);
                info!(survivor = %survivor_id, absorbed = %absorbed_id, "Incidents merged");
            }
            for entity in signal_entities(&signal) {
                self.table.index_entity(entity, survivor_id);
            }
            self.events.incident_updated(view);
            return survivor_id;
        }
    }

    fn sweep(&self, now_ms: u64) -> Vec<IncidentView> {
        let mut closed = Vec::new();

        for id in self.table.open_ids() {
            let Some(handle) = self.table.get(id) else {
                continue;
            };
            let mut guard = handle.lock();
            if guard.incident.state != IncidentState::Open {
                continue;
            }
            let idle = now_ms.saturating_sub(guard.incident.last_seen_ms);
            if idle <= self.config.window_ms {
                continue;
            }

            guard.incident.state = IncidentState::Closed;
            let view = guard.to_view();
            let entities = guard.incident.affected_entities.clone();
            drop(guard);

            self.table.record_closed(id, &entities);
            self.events.incident_closed(view.clone());
            info!(incident = %id, "Incident closed (window expired)");
            closed.push(view);
        }

        closed
    }

    fn close_incident(&self, id: IncidentId) -> Result<IncidentView, CorrelationError> {
        let handle = self
            .table
            .get(id)
            .ok_or(CorrelationError::UnknownIncident(id))?;

        let mut guard = handle.lock();
        match guard.incident.state {
            IncidentState::Open => {}
            IncidentState::Closed | IncidentState::MergedInto(_) => {
                return Err(CorrelationError::IncidentClosed(id));
            }
        }

        guard.incident.state = IncidentState::Closed;
        let view = guard.to_view();
        let entities = guard.incident.affected_entities.clone();
        drop(guard);

        self.table.record_closed(id, &entities);
        self.events.incident_closed(view.clone());
        info!(incident = %id, "Incident closed (terminal action)");
        Ok(view)
    }

    fn view(&self, id: IncidentId) -> Option<IncidentView> {
        self.table.get(id).map(|handle| handle.lock().to_view())
    }

    fn stats(&self) -> CorrelatorStats {
        CorrelatorStats {
            open_incidents: self.table.open_count(),
            closed_incidents: self.table.closed_count(),
            merges: self.merges.load(Ordering::Relaxed),
        }
    }
}
