//! Event-sink adapters: subsystem notifications onto the shared bus, with
//! the matching Prometheus counters.

use sentinel_telemetry as metrics;
use shared_bus::{DefenseEvent, InMemoryEventBus};
use shared_types::{
    ActionId, EntityId, IncidentDigest, IncidentId, IncidentView, NodeId, Outcome, ResponseAction,
    Signal, SignalId, ThreatScore,
};
use std::sync::Arc;

/// One adapter implements every subsystem's event-sink port; each
/// notification becomes a bus event plus a metric update.
pub struct BusEventAdapter {
    bus: Arc<InMemoryEventBus>,
}

impl BusEventAdapter {
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self { bus }
    }
}

impl sm_01_signal_bus::ports::outbound::IngestEventSink for BusEventAdapter {
    fn signal_accepted(&self, signal: &Signal) {
        metrics::SIGNALS_INGESTED.inc();
        self.bus
            .publish_sync(DefenseEvent::SignalAccepted(signal.clone()));
    }

    fn signal_rejected(&self, signal_id: Option<SignalId>, reason: &str) {
        metrics::SIGNALS_REJECTED.inc();
        self.bus.publish_sync(DefenseEvent::SignalRejected {
            signal_id,
            reason: reason.to_string(),
        });
    }

    fn signal_dropped(&self, entity: &EntityId, dropped: SignalId, total_dropped: u64) {
        metrics::SIGNALS_DROPPED.inc();
        self.bus.publish_sync(DefenseEvent::SignalDropped {
            source_entity: entity.clone(),
            dropped_signal_id: dropped,
            total_dropped,
        });
    }
}

impl sm_02_correlator::ports::outbound::CorrelationEventSink for BusEventAdapter {
    fn incident_opened(&self, id: IncidentId, entity: &EntityId) {
        metrics::INCIDENTS_OPENED.inc();
        metrics::INCIDENTS_OPEN.inc();
        self.bus.publish_sync(DefenseEvent::IncidentOpened {
            incident_id: id,
            entity: entity.clone(),
        });
    }

    fn incident_updated(&self, view: IncidentView) {
        self.bus.publish_sync(DefenseEvent::IncidentUpdated(view));
    }

    fn incidents_merged(&self, surviving: IncidentId, absorbed: IncidentId) {
        metrics::INCIDENTS_MERGED.inc();
        metrics::INCIDENTS_OPEN.dec();
        self.bus.publish_sync(DefenseEvent::IncidentsMerged {
            surviving,
            absorbed,
        });
    }

    fn incident_closed(&self, view: IncidentView) {
        metrics::INCIDENTS_CLOSED.inc();
        metrics::INCIDENTS_OPEN.dec();
        self.bus
            .publish_sync(DefenseEvent::IncidentClosed { view });
    }
}

impl sm_03_scorer::ports::outbound::ScoringEventSink for BusEventAdapter {
    fn score_computed(&self, score: &ThreatScore) {
        metrics::SCORES_COMPUTED.inc();
        self.bus
            .publish_sync(DefenseEvent::ScoreComputed(score.clone()));
    }

    fn scoring_fault(&self, incident_id: IncidentId, reason: &str) {
        metrics::SCORING_FAULTS.inc();
        self.bus.publish_sync(DefenseEvent::ScoringFault {
            incident_id,
            reason: reason.to_string(),
        });
    }
}

impl sm_04_policy_engine::ports::outbound::PolicyEventSink for BusEventAdapter {
    fn action_decided(&self, action: &ResponseAction) {
        metrics::ACTIONS_DECIDED.inc();
        self.bus
            .publish_sync(DefenseEvent::ActionDecided(action.clone()));
    }

    fn critical_fault(&self, error: &str) {
        self.bus.publish_sync(DefenseEvent::CriticalFault {
            subsystem_id: shared_bus::events::subsystem::POLICY,
            error: error.to_string(),
        });
    }
}

impl sm_05_response::ports::outbound::ResponseEventSink for BusEventAdapter {
    fn dispatch_completed(&self, action_id: ActionId, incident_id: IncidentId, outcome: &Outcome) {
        metrics::ACTIONS_DISPATCHED.inc();
        if matches!(outcome, Outcome::Failed(_)) {
            metrics::DISPATCH_FAILURES.inc();
        }
        self.bus.publish_sync(DefenseEvent::DispatchCompleted {
            action_id,
            incident_id,
            outcome: outcome.clone(),
        });
    }

    fn queue_saturated(&self, queue_depth: usize) {
        metrics::DISPATCH_QUEUE_DEPTH.set(queue_depth as f64);
        self.bus
            .publish_sync(DefenseEvent::DispatchQueueSaturated { queue_depth });
    }
}

impl sm_06_federation::ports::outbound::FederationEventSink for BusEventAdapter {
    fn digest_received(&self, origin: NodeId, digest: &IncidentDigest) {
        metrics::FEDERATION_MESSAGES_RECEIVED.inc();
        self.bus.publish_sync(DefenseEvent::PeerDigestReceived {
            origin,
            digest: digest.clone(),
        });
    }

    fn message_rejected(&self, origin: NodeId) {
        metrics::FEDERATION_MESSAGES_REJECTED.inc();
        self.bus
            .publish_sync(DefenseEvent::FederationMessageRejected { origin });
    }
}

/// One wall clock for every subsystem's `TimeSource` port.
pub struct WallClock;

impl WallClock {
    pub fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

impl sm_01_signal_bus::ports::outbound::TimeSource for WallClock {
    fn now_ms(&self) -> u64 {
        WallClock::now_ms(self)
    }
}

impl sm_03_scorer::ports::outbound::TimeSource for WallClock {
    fn now_ms(&self) -> u64 {
        WallClock::now_ms(self)
    }
}

impl sm_04_policy_engine::ports::outbound::TimeSource for WallClock {
    fn now_ms(&self) -> u64 {
        WallClock::now_ms(self)
    }
}

impl sm_06_federation::ports::outbound::TimeSource for WallClock {
    fn now_ms(&self) -> u64 {
        WallClock::now_ms(self)
    }
}
