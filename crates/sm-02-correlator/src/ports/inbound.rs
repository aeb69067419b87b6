//! Inbound ports (API) for the Correlator subsystem.

use crate::domain::CorrelatorStats;
use shared_types::{CorrelationError, IncidentId, IncidentView, Signal};

/// Primary correlation API.
pub trait CorrelatorApi: Send + Sync {
    /// Correlate one accepted signal: attach to an open incident within the
    /// window, merging simultaneously-touched incidents, or open a new one.
    /// Returns the id of the incident the signal now belongs to.
    fn handle_signal(&self, signal: Signal) -> IncidentId;

    /// Close incidents whose window expired without a new attachment.
    /// Returns the views of the incidents closed by this sweep.
    fn sweep(&self, now_ms: u64) -> Vec<IncidentView>;

    /// Close an incident because the Policy Engine issued a terminal
    /// action for it.
    fn close_incident(&self, id: IncidentId) -> Result<IncidentView, CorrelationError>;

    /// Read-only snapshot of an incident, if still retained.
    fn view(&self, id: IncidentId) -> Option<IncidentView>;

    /// Correlator counters.
    fn stats(&self) -> CorrelatorStats;
}
