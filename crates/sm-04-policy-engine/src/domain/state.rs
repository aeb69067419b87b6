//! Per-incident decision state machine: Open → Evaluated → Actioned → Closed.

use parking_lot::Mutex;
use shared_types::{ActionDiscriminant, IncidentId};
use std::collections::HashMap;

/// Decision lifecycle phase for one incident.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionPhase {
    /// No score evaluated yet.
    Open,
    /// At least one score evaluated.
    Evaluated,
    /// At least one action dispatched.
    Actioned,
    /// Terminal: the incident closed; no further decisions.
    Closed,
}

#[derive(Clone, Copy, Debug)]
struct DecisionState {
    phase: DecisionPhase,
    /// Variant of the last dispatched action (dispatch dedup).
    last_dispatched: Option<ActionDiscriminant>,
}

/// Tracks decision phases across incidents.
///
/// Phases only move forward; `Closed` is terminal and sticky even if a
/// stale score arrives afterwards.
#[derive(Default)]
pub struct DecisionTable {
    states: Mutex<HashMap<IncidentId, DecisionState>>,
}

impl DecisionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, id: IncidentId) -> DecisionPhase {
        self.states
            .lock()
            .get(&id)
            .map(|s| s.phase)
            .unwrap_or(DecisionPhase::Open)
    }

    /// Whether decisions may still be made for this incident.
    pub fn accepts_decisions(&self, id: IncidentId) -> bool {
        self.phase(id) != DecisionPhase::Closed
    }

    /// Record that a score was evaluated.
    pub fn mark_evaluated(&self, id: IncidentId) {
        let mut states = self.states.lock();
        let state = states.entry(id).or_insert(DecisionState {
            phase: DecisionPhase::Open,
            last_dispatched: None,
        });
        if state.phase == DecisionPhase::Open {
            state.phase = DecisionPhase::Evaluated;
        }
    }

    /// Record a dispatched action. Returns `false` when the same variant
    /// was already dispatched for this incident (dedup).
    pub fn mark_actioned(&self, id: IncidentId, action: ActionDiscriminant) -> bool {
        let mut states = self.states.lock();
        let state = states.entry(id).or_insert(DecisionState {
            phase: DecisionPhase::Open,
            last_dispatched: None,
        });
        if state.phase == DecisionPhase::Closed {
            return false;
        }
        if state.last_dispatched == Some(action) {
            return false;
        }
        state.phase = DecisionPhase::Actioned;
        state.last_dispatched = Some(action);
        true
    }

    /// Record incident closure. Terminal.
    pub fn mark_closed(&self, id: IncidentId) {
        let mut states = self.states.lock();
        let state = states.entry(id).or_insert(DecisionState {
            phase: DecisionPhase::Open,
            last_dispatched: None,
        });
        state.phase = DecisionPhase::Closed;
    }

    /// Forget an incident (retention housekeeping).
    pub fn forget(&self, id: IncidentId) {
        self.states.lock().remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_progression() {
        let table = DecisionTable::new();
        let id = IncidentId(1);

        assert_eq!(table.phase(id), DecisionPhase::Open);
        table.mark_evaluated(id);
        assert_eq!(table.phase(id), DecisionPhase::Evaluated);
        assert!(table.mark_actioned(id, ActionDiscriminant::Alert));
        assert_eq!(table.phase(id), DecisionPhase::Actioned);
        table.mark_closed(id);
        assert_eq!(table.phase(id), DecisionPhase::Closed);
    }

    #[test]
    fn test_duplicate_variant_deduped() {
        let table = DecisionTable::new();
        let id = IncidentId(1);

        assert!(table.mark_actioned(id, ActionDiscriminant::Alert));
        assert!(!table.mark_actioned(id, ActionDiscriminant::Alert));
        // Escalation to a different variant still dispatches.
        assert!(table.mark_actioned(id, ActionDiscriminant::Isolate));
    }

    #[test]
    fn test_closed_is_sticky() {
        let table = DecisionTable::new();
        let id = IncidentId(1);

        table.mark_closed(id);
        assert!(!table.accepts_decisions(id));
        assert!(!table.mark_actioned(id, ActionDiscriminant::Alert));
        assert_eq!(table.phase(id), DecisionPhase::Closed);
    }

    #[test]
    fn test_evaluated_does_not_regress_actioned() {
        let table = DecisionTable::new();
        let id = IncidentId(1);

        table.mark_actioned(id, ActionDiscriminant::Alert);
        table.mark_evaluated(id);
        assert_eq!(table.phase(id), DecisionPhase::Actioned);
    }
}
