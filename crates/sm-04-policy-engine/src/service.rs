//! # Policy Engine Service
//!
//! Implements [`PolicyApi`]: rule selection, budget charging, jurisdiction
//! and posture bounds, dispatch with saturation fallback, and the
//! per-incident decision state machine.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    choose_action, select_target, ChosenAction, DecisionTable, DefensePosture, PolicyConfig,
    PolicyStats, PostureController, ResourceBudget, RuleSet,
};
use crate::ports::inbound::PolicyApi;
use crate::ports::outbound::{DispatchGateway, PolicyEventSink, TimeSource};
use shared_types::{
    ActionDiscriminant, ActionId, ActionKind, DispatchError, IncidentId, IncidentView,
    Justification, Outcome, ResponseAction, ThreatScore,
};

/// Result of one policy evaluation, as seen by the caller (the runtime's
/// choreography handler).
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub action: ResponseAction,
    /// The action was handed to the dispatch queue.
    pub dispatched: bool,
    /// The action terminates the incident (the caller closes it).
    pub terminal: bool,
}

/// Policy Engine service.
///
/// Dependencies:
/// - `G: DispatchGateway` - the Response Orchestrator's queue
/// - `E: PolicyEventSink` - pipeline event notifications
/// - `T: TimeSource` - clock for posture windows
pub struct PolicyService<G, E, T>
where
    G: DispatchGateway,
    E: PolicyEventSink,
    T: TimeSource,
{
    config: PolicyConfig,
    rules: RuleSet,
    budget: ResourceBudget,
    posture: PostureController,
    decisions: DecisionTable,
    gateway: Arc<G>,
    events: Arc<E>,
    time: Arc<T>,
    throttled: AtomicBool,
    decision_count: AtomicU64,
    forced_alerts: AtomicU64,
}

impl<G, E, T> PolicyService<G, E, T>
where
    G: DispatchGateway,
    E: PolicyEventSink,
    T: TimeSource,
{
    /// Build the service, validating the configured rule set.
    pub fn new(
        config: PolicyConfig,
        posture_override: Option<DefensePosture>,
        gateway: Arc<G>,
        events: Arc<E>,
        time: Arc<T>,
    ) -> Result<Self, shared_types::PolicyError> {
        let rules = RuleSet::load(config.rules.clone(), config.rules_version)?;
        Ok(Self {
            budget: ResourceBudget::new(config.budget_capacity),
            posture: PostureController::new(config.posture_thresholds.clone(), posture_override),
            decisions: DecisionTable::new(),
            rules,
            gateway,
            events,
            time,
            config,
            throttled: AtomicBool::new(false),
            decision_count: AtomicU64::new(0),
            forced_alerts: AtomicU64::new(0),
        })
    }

    /// Give a chosen variant its concrete parameters.
    fn materialize(&self, chosen: ActionDiscriminant, view: &IncidentView) -> ActionKind {
        match chosen {
            ActionDiscriminant::NoAction => ActionKind::NoAction,
            ActionDiscriminant::Alert => ActionKind::Alert,
            ActionDiscriminant::Deceive => ActionKind::Deceive {
                target: select_target(view),
                profile_id: self.config.deceive_profile.clone(),
            },
            ActionDiscriminant::Isolate => ActionKind::Isolate {
                target: select_target(view),
                duration_ms: self.config.isolate_duration_ms,
            },
            ActionDiscriminant::Block => ActionKind::Block {
                target: select_target(view),
                scope: self.config.block_scope,
            },
        }
    }

    fn build_action(
        &self,
        view: &IncidentView,
        score: &ThreatScore,
        chosen: &ChosenAction,
    ) -> ResponseAction {
        ResponseAction {
            id: ActionId::generate(),
            incident_id: view.id(),
            kind: self.materialize(chosen.discriminant, view),
            justification: Justification {
                score_value: score.value,
                score_computed_at_ms: score.computed_at_ms,
                rule_id: chosen.rule_id,
            },
        }
    }

    /// The stage-boundary fallback: any unexpected fault becomes a
    /// NoAction-with-Alert decision so the pipeline keeps moving and the
    /// incident stays human-visible.
    fn fallback_alert(&self, view: &IncidentView, score: &ThreatScore, error: &str) -> Decision {
        warn!(incident = %view.id(), error, "Policy fault contained, falling back to Alert");
        self.events.critical_fault(error);

        let action = ResponseAction {
            id: ActionId::generate(),
            incident_id: view.id(),
            kind: ActionKind::Alert,
            justification: Justification {
                score_value: score.value,
                score_computed_at_ms: score.computed_at_ms,
                rule_id: self
                    .rules
                    .rules()
                    .first()
                    .map(|r| r.id)
                    .unwrap_or(shared_types::RuleId(0)),
            },
        };
        self.events.action_decided(&action);
        let dispatched = self.dispatch(&action);
        Decision {
            action,
            dispatched,
            terminal: false,
        }
    }

    /// Hand an action to the dispatch queue, flipping the throttle flag on
    /// saturation.
    fn dispatch(&self, action: &ResponseAction) -> bool {
        match self.gateway.enqueue(action.clone()) {
            Ok(()) => {
                self.throttled.store(false, Ordering::Relaxed);
                true
            }
            Err(DispatchError::QueueSaturated) => {
                warn!(action = %action.id, "Dispatch queue saturated, throttling");
                self.throttled.store(true, Ordering::Relaxed);
                false
            }
            Err(e) => {
                warn!(action = %action.id, error = %e, "Dispatch enqueue failed");
                false
            }
        }
    }
}

impl<G, E, T> PolicyApi for PolicyService<G, E, T>
where
    G: DispatchGateway,
    E: PolicyEventSink,
    T: TimeSource,
{
    fn on_score(&self, view: &IncidentView, score: &ThreatScore) -> Decision {
        let incident_id = view.id();
        self.decision_count.fetch_add(1, Ordering::Relaxed);

        if !self.decisions.accepts_decisions(incident_id) || !view.incident.is_open() {
            debug!(incident = %incident_id, "Score for closed incident ignored");
            let action = self.build_action(
                view,
                score,
                &ChosenAction {
                    discriminant: ActionDiscriminant::NoAction,
                    rule_id: shared_types::RuleId(0),
                    charged: 0,
                    forced_alert: false,
                    downgraded: false,
                },
            );
            return Decision {
                action,
                dispatched: false,
                terminal: false,
            };
        }

        self.decisions.mark_evaluated(incident_id);

        let chosen = match choose_action(
            score.value,
            &self.rules,
            &self.config.jurisdiction,
            &self.config.action_costs,
            &self.budget,
            self.posture.current(),
            self.config.alert_floor,
            self.throttled.load(Ordering::Relaxed),
        ) {
            Ok(chosen) => chosen,
            Err(e) => return self.fallback_alert(view, score, &e.to_string()),
        };

        if chosen.forced_alert {
            self.forced_alerts.fetch_add(1, Ordering::Relaxed);
        }

        let action = self.build_action(view, score, &chosen);
        self.events.action_decided(&action);

        let terminal = self.config.terminal_actions.contains(&chosen.discriminant);
        let mut dispatched = false;

        if chosen.discriminant != ActionDiscriminant::NoAction {
            if self.decisions.mark_actioned(incident_id, chosen.discriminant) {
                dispatched = self.dispatch(&action);
                if dispatched {
                    self.posture.record_actioned(self.time.now_ms());
                    info!(
                        incident = %incident_id,
                        action = %chosen.discriminant,
                        rule = %chosen.rule_id,
                        score = score.value,
                        "Action dispatched"
                    );
                } else if chosen.discriminant != ActionDiscriminant::Alert {
                    // Saturation fallback: the queue refused the costly
                    // action; an Alert still goes out.
                    let alert = ResponseAction {
                        id: ActionId::generate(),
                        incident_id,
                        kind: ActionKind::Alert,
                        justification: action.justification.clone(),
                    };
                    self.events.action_decided(&alert);
                    self.dispatch(&alert);
                }
            } else {
                debug!(
                    incident = %incident_id,
                    action = %chosen.discriminant,
                    "Duplicate variant suppressed"
                );
            }
        }

        Decision {
            action,
            dispatched,
            terminal: terminal && dispatched,
        }
    }

    fn set_throttled(&self, throttled: bool) {
        self.throttled.store(throttled, Ordering::Relaxed);
    }

    fn on_dispatch_outcome(&self, incident_id: IncidentId, outcome: &Outcome) {
        // Terminal Failed outcomes still leave the incident Actioned: an
        // unresponsive handler must not wedge the state machine.
        debug!(incident = %incident_id, ?outcome, "Dispatch outcome recorded");
    }

    fn mark_closed(&self, incident_id: IncidentId) {
        self.decisions.mark_closed(incident_id);
    }

    fn replenish_budget(&self) {
        self.budget.replenish();
        debug!(available = self.budget.available(), "Budget replenished");
    }

    fn review_posture(&self) -> DefensePosture {
        self.posture.review(
            self.time.now_ms(),
            self.budget.available(),
            self.budget.capacity(),
        )
    }

    fn posture(&self) -> DefensePosture {
        self.posture.current()
    }

    fn stats(&self) -> PolicyStats {
        PolicyStats {
            decisions: self.decision_count.load(Ordering::Relaxed),
            forced_alerts: self.forced_alerts.load(Ordering::Relaxed),
            budget_available: self.budget.available(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use shared_types::{EntityId, Incident, SignalId, Signal, SignalKind};
    use std::collections::BTreeMap;

    // ==========================================================================
    // MOCK IMPLEMENTATIONS FOR TESTING
    // ==========================================================================

    #[derive(Default)]
    struct RecordingGateway {
        enqueued: Mutex<Vec<ResponseAction>>,
        saturated: AtomicBool,
    }

    impl DispatchGateway for RecordingGateway {
        fn enqueue(&self, action: ResponseAction) -> Result<(), DispatchError> {
            if self.saturated.load(Ordering::Relaxed) {
                return Err(DispatchError::QueueSaturated);
            }
            self.enqueued.lock().push(action);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingEvents {
        decided: Mutex<Vec<ResponseAction>>,
        faults: Mutex<Vec<String>>,
    }

    impl PolicyEventSink for RecordingEvents {
        fn action_decided(&self, action: &ResponseAction) {
            self.decided.lock().push(action.clone());
        }

        fn critical_fault(&self, error: &str) {
            self.faults.lock().push(error.to_string());
        }
    }

    struct FixedTime(u64);

    impl TimeSource for FixedTime {
        fn now_ms(&self) -> u64 {
            self.0
        }
    }

    fn view(id: u64) -> IncidentView {
        let signal = Signal {
            id: SignalId::generate(),
            source_entity: EntityId::new("attacker"),
            kind: SignalKind::ExfilPattern,
            timestamp_ms: 1_000,
            attributes: BTreeMap::new(),
            confidence: 0.9,
        };
        let incident = Incident::open(IncidentId(id), &signal);
        IncidentView {
            incident,
            signals: vec![signal],
        }
    }

    fn score_of(id: u64, value: f64) -> ThreatScore {
        ThreatScore {
            incident_id: IncidentId(id),
            value,
            contributing_factors: vec![],
            member_version: 1,
            computed_at_ms: 5_000,
        }
    }

    type TestService = PolicyService<RecordingGateway, RecordingEvents, FixedTime>;

    fn create_service(
        config: PolicyConfig,
    ) -> (Arc<TestService>, Arc<RecordingGateway>, Arc<RecordingEvents>) {
        let gateway = Arc::new(RecordingGateway::default());
        let events = Arc::new(RecordingEvents::default());
        let service = Arc::new(
            PolicyService::new(
                config,
                None,
                Arc::clone(&gateway),
                Arc::clone(&events),
                Arc::new(FixedTime(10_000)),
            )
            .unwrap(),
        );
        (service, gateway, events)
    }

    #[test]
    fn test_high_severity_dispatches_isolate() {
        let (service, gateway, events) = create_service(PolicyConfig::default());

        let decision = service.on_score(&view(1), &score_of(1, 0.95));

        assert!(decision.dispatched);
        assert!(decision.terminal);
        assert!(matches!(decision.action.kind, ActionKind::Isolate { .. }));
        assert_eq!(decision.action.justification.rule_id, shared_types::RuleId(4));
        assert_eq!(gateway.enqueued.lock().len(), 1);
        assert_eq!(events.decided.lock().len(), 1);
    }

    #[test]
    fn test_low_severity_no_dispatch() {
        let (service, gateway, _events) = create_service(PolicyConfig::default());

        let decision = service.on_score(&view(1), &score_of(1, 0.1));

        assert!(!decision.dispatched);
        assert!(!decision.terminal);
        assert!(matches!(decision.action.kind, ActionKind::NoAction));
        assert!(gateway.enqueued.lock().is_empty());
    }

    #[test]
    fn test_action_references_triggering_score() {
        let (service, _gateway, _events) = create_service(PolicyConfig::default());

        let score = score_of(1, 0.95);
        let decision = service.on_score(&view(1), &score);

        assert_eq!(decision.action.justification.score_value, 0.95);
        assert_eq!(decision.action.justification.score_computed_at_ms, 5_000);
    }

    #[test]
    fn test_duplicate_variant_not_redispatched() {
        let (service, gateway, _events) = create_service(PolicyConfig::default());

        service.on_score(&view(1), &score_of(1, 0.5));
        service.on_score(&view(1), &score_of(1, 0.5));

        // Same Alert variant twice: only one dispatch.
        assert_eq!(gateway.enqueued.lock().len(), 1);
    }

    #[test]
    fn test_escalation_redispatches() {
        let (service, gateway, _events) = create_service(PolicyConfig::default());

        service.on_score(&view(1), &score_of(1, 0.5)); // Alert
        service.on_score(&view(1), &score_of(1, 0.95)); // Isolate

        let enqueued = gateway.enqueued.lock();
        assert_eq!(enqueued.len(), 2);
        assert!(matches!(enqueued[1].kind, ActionKind::Isolate { .. }));
    }

    #[test]
    fn test_closed_incident_gets_no_decisions() {
        let (service, gateway, _events) = create_service(PolicyConfig::default());

        service.mark_closed(IncidentId(1));
        let decision = service.on_score(&view(1), &score_of(1, 0.95));

        assert!(!decision.dispatched);
        assert!(matches!(decision.action.kind, ActionKind::NoAction));
        assert!(gateway.enqueued.lock().is_empty());
    }

    #[test]
    fn test_saturated_queue_falls_back_to_alert() {
        let (service, gateway, events) = create_service(PolicyConfig::default());
        gateway.saturated.store(true, Ordering::Relaxed);

        let decision = service.on_score(&view(1), &score_of(1, 0.95));

        // The Isolate did not reach the queue; a fallback Alert was decided.
        assert!(!decision.dispatched);
        let decided = events.decided.lock();
        assert_eq!(decided.len(), 2);
        assert!(matches!(decided[1].kind, ActionKind::Alert));
        drop(decided);

        // And subsequent decisions prefer Alert while throttled.
        gateway.saturated.store(false, Ordering::Relaxed);
        let next = service.on_score(&view(2), &score_of(2, 0.95));
        assert!(matches!(next.action.kind, ActionKind::Alert));
    }

    #[test]
    fn test_budget_exhaustion_only_alerts_until_replenish() {
        let config = PolicyConfig {
            budget_capacity: 6,
            ..Default::default()
        };
        let (service, _gateway, _events) = create_service(config);

        // First Isolate (cost 6) drains the budget.
        let first = service.on_score(&view(1), &score_of(1, 0.95));
        assert!(matches!(first.action.kind, ActionKind::Isolate { .. }));
        assert_eq!(service.stats().budget_available, 0);

        // Next incident can only alert.
        let second = service.on_score(&view(2), &score_of(2, 0.95));
        assert!(matches!(second.action.kind, ActionKind::Alert));
        assert_eq!(service.stats().forced_alerts, 1);

        // Replenish restores the full response.
        service.replenish_budget();
        assert_eq!(service.stats().budget_available, 6);
        let third = service.on_score(&view(3), &score_of(3, 0.95));
        assert!(matches!(third.action.kind, ActionKind::Isolate { .. }));
    }

    #[test]
    fn test_posture_review_reacts_to_volume() {
        let (service, _gateway, _events) = create_service(PolicyConfig::default());

        assert_eq!(service.review_posture(), DefensePosture::Standard);
        for i in 0..30 {
            service.on_score(&view(i), &score_of(i, 0.95));
        }
        // Not all dispatches fit the budget, but enough actioned volume
        // accumulated to raise the posture.
        let posture = service.review_posture();
        assert!(matches!(
            posture,
            DefensePosture::Aggressive | DefensePosture::Paranoid | DefensePosture::Passive
        ));
        assert_ne!(posture, DefensePosture::Standard);
    }

    #[test]
    fn test_invalid_rule_set_rejected_at_startup() {
        let mut config = PolicyConfig::default();
        config.rules.remove(1);

        let result = PolicyService::new(
            config,
            None,
            Arc::new(RecordingGateway::default()),
            Arc::new(RecordingEvents::default()),
            Arc::new(FixedTime(0)),
        );
        assert!(result.is_err());
    }
}
