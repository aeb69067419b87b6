//! # Choreography Handlers
//!
//! Event handlers driving the pipeline over the shared bus.
//!
//! ## Flow
//!
//! 1. Signal Bus delivers accepted signals into the Correlator (direct
//!    sink; ordering is per-entity).
//! 2. Correlator publishes `IncidentUpdated` → Scorer recomputes severity.
//! 3. Scorer publishes `ScoreComputed` → Policy Engine decides and
//!    dispatches; terminal actions close the incident.
//! 4. Correlator publishes `IncidentClosed` → Scorer purges its cache,
//!    Policy seals the decision record, Federation buffers a digest.
//! 5. Response publishes `DispatchQueueSaturated`/`DispatchCompleted` →
//!    Policy throttles or records outcomes.

use parking_lot::Mutex;
use shared_bus::{DefenseEvent, Subscription};
use shared_types::{IncidentDigest, IncidentId, IncidentView};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapters::{NodeFederation, WallClock};
use crate::container::subsystems::{NodeCorrelator, NodePolicy, NodeScorer};
use sm_02_correlator::CorrelatorApi;
use sm_03_scorer::ScorerApi;
use sm_04_policy_engine::PolicyApi;
use sm_06_federation::FederationApi;

/// Handler feeding incident updates into the Scorer.
pub struct ScoringHandler {
    receiver: Subscription,
    scorer: Arc<NodeScorer>,
}

impl ScoringHandler {
    pub fn new(receiver: Subscription, scorer: Arc<NodeScorer>) -> Self {
        Self { receiver, scorer }
    }

    pub async fn run(mut self) {
        info!("[sm-03] Scoring handler started");
        while let Some(event) = self.receiver.recv().await {
            match event {
                DefenseEvent::IncidentUpdated(view) => {
                    // Faults inside score() are already converted to a
                    // zero score; an Err here only means "closed", which a
                    // racing close can legitimately produce.
                    if let Err(e) = self.scorer.score(&view) {
                        debug!(incident = %view.id(), error = %e, "Score skipped");
                    }
                }
                DefenseEvent::IncidentClosed { view } => {
                    self.scorer.purge(view.id());
                }
                _ => {}
            }
        }
        info!("[sm-03] Scoring handler stopped");
    }
}

/// Handler feeding scores into the Policy Engine and applying its
/// decisions' lifecycle effects.
pub struct PolicyHandler {
    receiver: Subscription,
    policy: Arc<NodePolicy>,
    correlator: Arc<NodeCorrelator>,
}

impl PolicyHandler {
    pub fn new(
        receiver: Subscription,
        policy: Arc<NodePolicy>,
        correlator: Arc<NodeCorrelator>,
    ) -> Self {
        Self {
            receiver,
            policy,
            correlator,
        }
    }

    pub async fn run(mut self) {
        info!("[sm-04] Policy handler started");
        while let Some(event) = self.receiver.recv().await {
            match event {
                DefenseEvent::ScoreComputed(score) => {
                    let Some(view) = self.correlator.view(score.incident_id) else {
                        debug!(incident = %score.incident_id, "Score for vanished incident");
                        continue;
                    };
                    let decision = self.policy.on_score(&view, &score);
                    if decision.terminal {
                        // Terminal action: the incident freezes now.
                        match self.correlator.close_incident(score.incident_id) {
                            Ok(_) => {
                                debug!(incident = %score.incident_id, "Closed by terminal action");
                            }
                            Err(e) => {
                                debug!(incident = %score.incident_id, error = %e, "Close raced");
                            }
                        }
                    }
                }
                DefenseEvent::IncidentClosed { view } => {
                    self.policy.mark_closed(view.id());
                }
                DefenseEvent::DispatchQueueSaturated { queue_depth } => {
                    warn!(queue_depth, "Dispatch queue saturated, throttling policy");
                    self.policy.set_throttled(true);
                }
                DefenseEvent::DispatchCompleted {
                    incident_id,
                    outcome,
                    ..
                } => {
                    self.policy.on_dispatch_outcome(incident_id, &outcome);
                }
                _ => {}
            }
        }
        info!("[sm-04] Policy handler stopped");
    }
}

/// Handler buffering closed incidents as federation digests.
pub struct FederationHandler {
    receiver: Subscription,
    federation: Arc<NodeFederation>,
    clock: Arc<WallClock>,
    /// Last known severity per incident, for digest building.
    last_scores: Mutex<HashMap<IncidentId, f64>>,
}

impl FederationHandler {
    pub fn new(
        receiver: Subscription,
        federation: Arc<NodeFederation>,
        clock: Arc<WallClock>,
    ) -> Self {
        Self {
            receiver,
            federation,
            clock,
            last_scores: Mutex::new(HashMap::new()),
        }
    }

    fn build_digest(&self, view: &IncidentView, severity: f64, closed_at_ms: u64) -> IncidentDigest {
        let mut kind_counts: BTreeMap<String, u32> = BTreeMap::new();
        for signal in &view.signals {
            *kind_counts.entry(signal.kind.label().to_string()).or_insert(0) += 1;
        }
        IncidentDigest {
            incident_id: view.id(),
            affected_entities: view.incident.affected_entities.clone(),
            severity,
            kind_counts,
            closed_at_ms,
        }
    }

    pub async fn run(mut self) {
        info!("[sm-06] Federation handler started");
        while let Some(event) = self.receiver.recv().await {
            match event {
                DefenseEvent::ScoreComputed(score) => {
                    self.last_scores
                        .lock()
                        .insert(score.incident_id, score.value);
                }
                DefenseEvent::IncidentClosed { view } => {
                    let severity = self
                        .last_scores
                        .lock()
                        .remove(&view.id())
                        .unwrap_or(0.0);
                    let digest = self.build_digest(&view, severity, self.clock.now_ms());
                    self.federation.buffer_digest(digest);
                    debug!(incident = %view.id(), severity, "Digest buffered for gossip");
                }
                _ => {}
            }
        }
        info!("[sm-06] Federation handler stopped");
    }
}
