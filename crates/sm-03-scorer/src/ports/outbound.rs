//! Outbound ports (SPI) for the Scorer subsystem.

use shared_types::{EntityId, IncidentId, ScoringError, ThreatScore};
use std::collections::{BTreeMap, BTreeSet};

/// The external scoring capability (an ML model or heuristic stand-in).
///
/// The Scorer only assembles features and normalizes the result; the model
/// itself is opaque and swappable.
pub trait ScoringCapability: Send + Sync {
    /// Evaluate a feature map into a severity in [0, 1].
    ///
    /// Errors and non-finite results are treated by the caller as severity
    /// 0 with a recorded fault, never as a pipeline crash.
    fn evaluate(&self, features: &BTreeMap<String, f64>) -> Result<f64, ScoringError>;
}

/// Cross-node corroboration lookup (fed by Federation).
///
/// Peer digests raise a feature value; they never override a local score.
pub trait PeerIntelProvider: Send + Sync {
    /// Corroboration strength in [0, 1] for a set of entities: how strongly
    /// peer nodes have reported overlapping entities recently.
    fn corroboration_for(&self, entities: &BTreeSet<EntityId>) -> f64;
}

/// Event notifications emitted by the Scorer.
pub trait ScoringEventSink: Send + Sync {
    fn score_computed(&self, score: &ThreatScore);

    fn scoring_fault(&self, incident_id: IncidentId, reason: &str);
}

/// Clock abstraction.
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Default time source using system time.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
