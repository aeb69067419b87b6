//! Inbound ports (API) for the Scorer subsystem.

use shared_types::{IncidentId, IncidentView, ScoringError, ThreatScore};

/// Primary scoring API.
pub trait ScorerApi: Send + Sync {
    /// Compute (or return the cached) severity score for an incident
    /// snapshot.
    ///
    /// Never called for closed incidents; doing so is an error, not a
    /// recompute.
    fn score(&self, view: &IncidentView) -> Result<ThreatScore, ScoringError>;

    /// Drop cached state for an incident that closed.
    fn purge(&self, incident_id: IncidentId);
}
