//! # Scorer Service
//!
//! Implements [`ScorerApi`]: feature assembly, capability invocation with
//! the score-0 fault policy, and `(incident, member_version)` caching.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{assemble_features, contributing_factors, ScoreCache, ScorerConfig};
use crate::ports::inbound::ScorerApi;
use crate::ports::outbound::{PeerIntelProvider, ScoringCapability, ScoringEventSink, TimeSource};
use shared_types::{IncidentId, IncidentView, ScoreFactor, ScoringError, ThreatScore};

/// Scorer service.
///
/// Dependencies:
/// - `M: ScoringCapability` - the opaque model
/// - `P: PeerIntelProvider` - federation corroboration lookup
/// - `E: ScoringEventSink` - pipeline event notifications
/// - `T: TimeSource` - clock for `computed_at_ms`
pub struct ScorerService<M, P, E, T>
where
    M: ScoringCapability,
    P: PeerIntelProvider,
    E: ScoringEventSink,
    T: TimeSource,
{
    config: ScorerConfig,
    cache: ScoreCache,
    model: Arc<M>,
    peer_intel: Arc<P>,
    events: Arc<E>,
    time: Arc<T>,
}

impl<M, P, E, T> ScorerService<M, P, E, T>
where
    M: ScoringCapability,
    P: PeerIntelProvider,
    E: ScoringEventSink,
    T: TimeSource,
{
    pub fn new(
        config: ScorerConfig,
        model: Arc<M>,
        peer_intel: Arc<P>,
        events: Arc<E>,
        time: Arc<T>,
    ) -> Self {
        Self {
            cache: ScoreCache::new(config.cache_size),
            config,
            model,
            peer_intel,
            events,
            time,
        }
    }
}

impl<M, P, E, T> ScorerApi for ScorerService<M, P, E, T>
where
    M: ScoringCapability,
    P: PeerIntelProvider,
    E: ScoringEventSink,
    T: TimeSource,
{
    fn score(&self, view: &IncidentView) -> Result<ThreatScore, ScoringError> {
        if !view.incident.is_open() {
            return Err(ScoringError::IncidentClosed(view.id()));
        }

        if let Some(cached) = self.cache.get(view.id(), view.member_version()) {
            debug!(incident = %view.id(), version = view.member_version(), "Score cache hit");
            return Ok(cached);
        }

        let corroboration = self
            .peer_intel
            .corroboration_for(&view.incident.affected_entities);
        let features = assemble_features(view, corroboration);

        let (value, factors) = match self.model.evaluate(&features) {
            Ok(v) if v.is_finite() => (
                v.clamp(0.0, 1.0),
                contributing_factors(&features, self.config.max_factors),
            ),
            Ok(v) => {
                let reason = format!("non-finite severity {v}");
                warn!(incident = %view.id(), reason, "Scoring capability fault");
                self.events.scoring_fault(view.id(), &reason);
                (0.0, fault_factor(&reason))
            }
            Err(e) => {
                warn!(incident = %view.id(), error = %e, "Scoring capability fault");
                self.events.scoring_fault(view.id(), &e.to_string());
                (0.0, fault_factor(&e.to_string()))
            }
        };

        let score = ThreatScore {
            incident_id: view.id(),
            value,
            contributing_factors: factors,
            member_version: view.member_version(),
            computed_at_ms: self.time.now_ms(),
        };

        self.cache.insert(score.clone());
        self.events.score_computed(&score);
        debug!(incident = %view.id(), value, "Score computed");
        Ok(score)
    }

    fn purge(&self, incident_id: IncidentId) {
        self.cache.purge(incident_id);
    }
}

/// The single factor recorded when the capability was unavailable.
fn fault_factor(reason: &str) -> Vec<ScoreFactor> {
    vec![ScoreFactor {
        name: format!("scoring_unavailable: {reason}"),
        weight: 0.0,
    }]
}
