//! Inbound ports (API) for the Policy Engine subsystem.

use crate::domain::{DefensePosture, PolicyStats};
use crate::service::Decision;
use shared_types::{IncidentId, IncidentView, Outcome, ThreatScore};

/// Primary policy API.
pub trait PolicyApi: Send + Sync {
    /// Evaluate a fresh score for an incident and, when warranted, dispatch
    /// a response action.
    ///
    /// Never panics: internal faults collapse to a NoAction-with-Alert
    /// decision for the incident.
    fn on_score(&self, view: &IncidentView, score: &ThreatScore) -> Decision;

    /// Dispatch-queue saturation feedback from the Response Orchestrator.
    fn set_throttled(&self, throttled: bool);

    /// Record a dispatch outcome (moves the incident's decision phase).
    fn on_dispatch_outcome(&self, incident_id: IncidentId, outcome: &Outcome);

    /// Record that an incident closed; no further decisions for it.
    fn mark_closed(&self, incident_id: IncidentId);

    /// Restore the resource budget to capacity (replenish tick).
    fn replenish_budget(&self);

    /// Re-derive the defense posture from current load (posture tick).
    fn review_posture(&self) -> DefensePosture;

    fn posture(&self) -> DefensePosture;

    fn stats(&self) -> PolicyStats;
}
