//! Outbound ports (SPI) for the Correlator subsystem.

use shared_types::{EntityId, IncidentId, IncidentView};

/// Event notifications emitted by the Correlator.
pub trait CorrelationEventSink: Send + Sync {
    fn incident_opened(&self, id: IncidentId, entity: &EntityId);

    /// Member set changed (attach or merge); the Scorer recomputes on this.
    fn incident_updated(&self, view: IncidentView);

    fn incidents_merged(&self, surviving: IncidentId, absorbed: IncidentId);

    fn incident_closed(&self, view: IncidentView);
}
