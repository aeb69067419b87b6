//! # Defense Events
//!
//! Defines all event types that flow through the shared bus. These carry
//! the choreography of the defense pipeline: Signal Bus → Correlator →
//! Scorer → Policy Engine → Response Orchestrator, with Federation feeding
//! peer intelligence back in.

use serde::{Deserialize, Serialize};
use shared_types::entities::{
    ActionId, EntityId, IncidentId, IncidentView, Outcome, ResponseAction, SignalId, Signal,
    ThreatScore,
};
use shared_types::federation::{IncidentDigest, NodeId};

/// Subsystem identifiers, used as event sources.
pub mod subsystem {
    /// Node runtime (wiring, timers).
    pub const RUNTIME: u8 = 0;
    /// Signal Bus.
    pub const SIGNAL_BUS: u8 = 1;
    /// Correlator.
    pub const CORRELATOR: u8 = 2;
    /// Scorer.
    pub const SCORER: u8 = 3;
    /// Policy Engine.
    pub const POLICY: u8 = 4;
    /// Response Orchestrator.
    pub const RESPONSE: u8 = 5;
    /// Federation Coordinator.
    pub const FEDERATION: u8 = 6;
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DefenseEvent {
    // =========================================================================
    // SUBSYSTEM 1: SIGNAL BUS
    // =========================================================================
    /// A signal passed validation and was buffered for correlation.
    /// **CHOREOGRAPHY:** This is the trigger that starts the pipeline;
    /// consumed by the Correlator.
    SignalAccepted(Signal),

    /// A signal was rejected at the ingestion boundary.
    SignalRejected {
        /// Id of the rejected signal, when it could be parsed.
        signal_id: Option<SignalId>,
        reason: String,
    },

    /// Backpressure dropped the oldest unconsumed signal for an entity.
    /// Never silent: every drop is countable.
    SignalDropped {
        source_entity: EntityId,
        dropped_signal_id: SignalId,
        /// Running drop count for this entity.
        total_dropped: u64,
    },

    // =========================================================================
    // SUBSYSTEM 2: CORRELATOR
    // =========================================================================
    /// A new incident was opened.
    IncidentOpened {
        incident_id: IncidentId,
        entity: EntityId,
    },

    /// An incident's member set changed (attach or merge).
    /// **CHOREOGRAPHY:** Consumed by the Scorer, which recomputes severity.
    IncidentUpdated(IncidentView),

    /// Two incidents merged; the lower id survived.
    IncidentsMerged {
        surviving: IncidentId,
        absorbed: IncidentId,
    },

    /// An incident became immutable (inactivity or terminal action).
    /// **CHOREOGRAPHY:** Consumed by Federation for digest broadcast.
    IncidentClosed { view: IncidentView },

    // =========================================================================
    // SUBSYSTEM 3: SCORER
    // =========================================================================
    /// Severity was computed for an incident.
    /// **CHOREOGRAPHY:** Consumed by the Policy Engine.
    ScoreComputed(ThreatScore),

    /// The scoring capability failed; the incident was scored 0 and
    /// progressed anyway.
    ScoringFault {
        incident_id: IncidentId,
        reason: String,
    },

    // =========================================================================
    // SUBSYSTEM 4: POLICY ENGINE
    // =========================================================================
    /// A response action was decided for an incident.
    /// **CHOREOGRAPHY:** Consumed by the Response Orchestrator.
    ActionDecided(ResponseAction),

    // =========================================================================
    // SUBSYSTEM 5: RESPONSE ORCHESTRATOR
    // =========================================================================
    /// Dispatch of an action finished (success, partial, or terminal
    /// failure after bounded retries).
    DispatchCompleted {
        action_id: ActionId,
        incident_id: IncidentId,
        outcome: Outcome,
    },

    /// The dispatch queue is saturated. Throttle signal: the Policy Engine
    /// prefers Alert over costlier actions until pressure clears.
    DispatchQueueSaturated { queue_depth: usize },

    // =========================================================================
    // SUBSYSTEM 6: FEDERATION
    // =========================================================================
    /// A verified peer digest arrived and entered the intelligence store.
    PeerDigestReceived {
        origin: NodeId,
        digest: IncidentDigest,
    },

    /// An incoming federation message failed signature verification and
    /// was discarded.
    FederationMessageRejected { origin: NodeId },

    // =========================================================================
    // CRITICAL EVENTS (DLQ)
    // =========================================================================
    /// Unexpected stage fault, converted to a NoAction-with-Alert decision
    /// for the affected incident and surfaced here for the operator.
    CriticalFault {
        /// The subsystem that encountered the fault.
        subsystem_id: u8,
        error: String,
    },
}

impl DefenseEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::SignalAccepted(_)
            | Self::SignalRejected { .. }
            | Self::SignalDropped { .. } => EventTopic::SignalBus,
            Self::IncidentOpened { .. }
            | Self::IncidentUpdated(_)
            | Self::IncidentsMerged { .. }
            | Self::IncidentClosed { .. } => EventTopic::Correlation,
            Self::ScoreComputed(_) | Self::ScoringFault { .. } => EventTopic::Scoring,
            Self::ActionDecided(_) => EventTopic::Policy,
            Self::DispatchCompleted { .. } | Self::DispatchQueueSaturated { .. } => {
                EventTopic::Response
            }
            Self::PeerDigestReceived { .. } | Self::FederationMessageRejected { .. } => {
                EventTopic::Federation
            }
            Self::CriticalFault { .. } => EventTopic::DeadLetterQueue,
        }
    }

    /// Get the originating subsystem ID.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self {
            Self::SignalAccepted(_)
            | Self::SignalRejected { .. }
            | Self::SignalDropped { .. } => subsystem::SIGNAL_BUS,
            Self::IncidentOpened { .. }
            | Self::IncidentUpdated(_)
            | Self::IncidentsMerged { .. }
            | Self::IncidentClosed { .. } => subsystem::CORRELATOR,
            Self::ScoreComputed(_) | Self::ScoringFault { .. } => subsystem::SCORER,
            Self::ActionDecided(_) => subsystem::POLICY,
            Self::DispatchCompleted { .. } | Self::DispatchQueueSaturated { .. } => {
                subsystem::RESPONSE
            }
            Self::PeerDigestReceived { .. } | Self::FederationMessageRejected { .. } => {
                subsystem::FEDERATION
            }
            Self::CriticalFault { subsystem_id, .. } => *subsystem_id,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Subsystem 1 events.
    SignalBus,
    /// Subsystem 2 events.
    Correlation,
    /// Subsystem 3 events.
    Scoring,
    /// Subsystem 4 events.
    Policy,
    /// Subsystem 5 events.
    Response,
    /// Subsystem 6 events.
    Federation,
    /// Dead Letter Queue for critical faults.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Source subsystems to include. Empty means all sources.
    pub source_subsystems: Vec<u8>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            source_subsystems: Vec::new(),
        }
    }

    /// Create a filter for events from specific subsystems.
    #[must_use]
    pub fn from_subsystems(subsystems: Vec<u8>) -> Self {
        Self {
            topics: Vec::new(),
            source_subsystems: subsystems,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &DefenseEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.source_subsystems.is_empty()
            || self.source_subsystems.contains(&event.source_subsystem());

        topic_match && source_match
    }
}
