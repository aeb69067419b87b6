//! The decision function: severity → bounded, affordable, lawful action.

use super::{ActionCosts, DefensePosture, JurisdictionConfig, ResourceBudget, RuleSet};
use shared_types::{ActionDiscriminant, EntityId, IncidentView, PolicyError, RuleId};
use std::collections::HashMap;

/// Outcome of one policy decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChosenAction {
    pub discriminant: ActionDiscriminant,
    pub rule_id: RuleId,
    /// Budget units actually charged.
    pub charged: u64,
    /// Budget or throttling forced Alert below what the rule preferred.
    pub forced_alert: bool,
    /// Jurisdiction removed an intrusive option before selection.
    pub downgraded: bool,
}

/// Choose the response for a score.
///
/// Deterministic in (score, budget state, jurisdiction, posture,
/// throttled): the candidate order is fixed (cheapest first, less
/// restrictive on cost ties) and budget charging is the only stateful step.
///
/// Selection rules, in order:
/// 1. The matching policy rule (lowest id on range ties) bounds the
///    candidate set.
/// 2. A disabled `legal_constraint_tag`, a Passive posture, or a saturated
///    dispatch queue removes intrusive candidates (downgrade, never
///    escalate).
/// 3. The cheapest affordable candidate wins; its cost is charged.
/// 4. Above the posture-adjusted alert floor the engine never goes silent:
///    if nothing (or only NoAction) was affordable, Alert is emitted and
///    charged saturating.
pub fn choose_action(
    score: f64,
    rules: &RuleSet,
    jurisdiction: &JurisdictionConfig,
    costs: &ActionCosts,
    budget: &ResourceBudget,
    posture: DefensePosture,
    configured_alert_floor: f64,
    throttled: bool,
) -> Result<ChosenAction, PolicyError> {
    let rule = rules.select(score)?;
    let alert_floor = posture.alert_floor(configured_alert_floor);

    let jurisdiction_ok = jurisdiction.allows(&rule.legal_constraint_tag);
    let intrusive_ok = jurisdiction_ok && posture.allows_intrusive() && !throttled;

    let mut downgraded = false;
    let mut candidates: Vec<ActionDiscriminant> = rule
        .allowed_actions
        .iter()
        .copied()
        .filter(|action| {
            if action.restrictiveness() >= ActionDiscriminant::Deceive.restrictiveness()
                && !intrusive_ok
            {
                downgraded = true;
                false
            } else {
                true
            }
        })
        .collect();

    // Cheapest first; on equal cost the less restrictive action wins.
    candidates.sort_by_key(|action| {
        (
            costs.charge_for(*action, rule.resource_cost),
            action.restrictiveness(),
        )
    });

    for action in candidates {
        if action == ActionDiscriminant::NoAction && score >= alert_floor {
            // Never silent above the floor; a costlier candidate may still
            // be affordable.
            continue;
        }
        let charge = costs.charge_for(action, rule.resource_cost);
        if budget.try_charge(charge) {
            return Ok(ChosenAction {
                discriminant: action,
                rule_id: rule.id,
                charged: charge,
                forced_alert: false,
                downgraded: downgraded && !jurisdiction_ok,
            });
        }
    }

    // Nothing affordable (or only an unacceptable silence).
    if score >= alert_floor {
        let charge = costs.charge_for(ActionDiscriminant::Alert, rule.resource_cost);
        let charged = charge.min(budget.available());
        budget.charge_saturating(charge);
        return Ok(ChosenAction {
            discriminant: ActionDiscriminant::Alert,
            rule_id: rule.id,
            charged,
            forced_alert: true,
            downgraded: downgraded && !jurisdiction_ok,
        });
    }

    Ok(ChosenAction {
        discriminant: ActionDiscriminant::NoAction,
        rule_id: rule.id,
        charged: 0,
        forced_alert: false,
        downgraded: downgraded && !jurisdiction_ok,
    })
}

/// Pick the action target: the entity with the most member signals
/// (lexicographically smallest on ties, keeping selection deterministic).
pub fn select_target(view: &IncidentView) -> EntityId {
    let mut counts: HashMap<&EntityId, usize> = HashMap::new();
    for signal in &view.signals {
        *counts.entry(&signal.source_entity).or_insert(0) += 1;
    }

    view.incident
        .affected_entities
        .iter()
        .max_by(|a, b| {
            let ca = counts.get(a).copied().unwrap_or(0);
            let cb = counts.get(b).copied().unwrap_or(0);
            ca.cmp(&cb).then_with(|| b.cmp(a))
        })
        .cloned()
        .unwrap_or_else(|| EntityId::new("unknown"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::default_rules;
    use shared_types::{Incident, IncidentId, PolicyRule, SignalId, Signal, SignalKind};
    use std::collections::{BTreeMap, BTreeSet};

    fn rules() -> RuleSet {
        RuleSet::load(default_rules(), 1).unwrap()
    }

    fn open_jurisdiction() -> JurisdictionConfig {
        JurisdictionConfig::with_tags(vec!["default".to_string()])
    }

    fn choose(
        score: f64,
        budget: &ResourceBudget,
        posture: DefensePosture,
        throttled: bool,
    ) -> ChosenAction {
        choose_action(
            score,
            &rules(),
            &open_jurisdiction(),
            &ActionCosts::default(),
            budget,
            posture,
            0.4,
            throttled,
        )
        .unwrap()
    }

    #[test]
    fn test_low_severity_no_action() {
        let budget = ResourceBudget::new(100);
        let chosen = choose(0.1, &budget, DefensePosture::Standard, false);
        assert_eq!(chosen.discriminant, ActionDiscriminant::NoAction);
        assert_eq!(chosen.charged, 0);
        assert_eq!(budget.available(), 100);
    }

    #[test]
    fn test_mid_severity_prefers_cheapest() {
        // Rule 2 allows {Alert, Deceive}; Alert is cheaper.
        let budget = ResourceBudget::new(100);
        let chosen = choose(0.5, &budget, DefensePosture::Standard, false);
        assert_eq!(chosen.discriminant, ActionDiscriminant::Alert);
        assert_eq!(chosen.rule_id, RuleId(2));
        assert!(!chosen.forced_alert);
    }

    #[test]
    fn test_spec_example_budget_covers_only_isolate() {
        // Score 0.95, rule allows {Isolate, Block}; budget covers Isolate
        // (6) but not Block (8) — chosen action is Isolate either way since
        // Isolate is also cheaper.
        let budget = ResourceBudget::new(7);
        let chosen = choose(0.95, &budget, DefensePosture::Standard, false);
        assert_eq!(chosen.discriminant, ActionDiscriminant::Isolate);
        assert_eq!(chosen.rule_id, RuleId(4));
        assert_eq!(chosen.charged, 6);
        assert_eq!(budget.available(), 1);
    }

    #[test]
    fn test_exhausted_budget_forces_alert() {
        let budget = ResourceBudget::new(0);
        let chosen = choose(0.95, &budget, DefensePosture::Standard, false);
        assert_eq!(chosen.discriminant, ActionDiscriminant::Alert);
        assert!(chosen.forced_alert);
        assert_eq!(chosen.charged, 0);
        assert_eq!(budget.available(), 0);
    }

    #[test]
    fn test_budget_never_negative_under_forced_alert() {
        let budget = ResourceBudget::new(0);
        for _ in 0..5 {
            choose(0.95, &budget, DefensePosture::Standard, false);
        }
        assert_eq!(budget.available(), 0);
    }

    #[test]
    fn test_throttled_prefers_alert() {
        let budget = ResourceBudget::new(100);
        let chosen = choose(0.95, &budget, DefensePosture::Standard, true);
        assert_eq!(chosen.discriminant, ActionDiscriminant::Alert);
        assert!(chosen.forced_alert);
    }

    #[test]
    fn test_passive_posture_caps_at_alert() {
        let budget = ResourceBudget::new(100);
        let chosen = choose(0.95, &budget, DefensePosture::Passive, false);
        assert_eq!(chosen.discriminant, ActionDiscriminant::Alert);
    }

    #[test]
    fn test_paranoid_floor_alerts_on_low_severity() {
        let budget = ResourceBudget::new(100);
        // 0.3 is below the configured floor (0.4) but above Paranoid's (0.2).
        let standard = choose(0.3, &budget, DefensePosture::Standard, false);
        assert_eq!(standard.discriminant, ActionDiscriminant::NoAction);

        let paranoid = choose(0.3, &budget, DefensePosture::Paranoid, false);
        assert_eq!(paranoid.discriminant, ActionDiscriminant::Alert);
    }

    #[test]
    fn test_jurisdiction_downgrades_never_escalates() {
        let mut restricted_rules = default_rules();
        // The top rule requires a tag the jurisdiction has not enabled.
        restricted_rules[3].legal_constraint_tag = "aggressive-response".to_string();
        let rules = RuleSet::load(restricted_rules, 2).unwrap();
        let budget = ResourceBudget::new(100);

        let chosen = choose_action(
            0.95,
            &rules,
            &open_jurisdiction(),
            &ActionCosts::default(),
            &budget,
            DefensePosture::Standard,
            0.4,
            false,
        )
        .unwrap();

        // Isolate/Block disabled; the engine falls to Alert, never higher.
        assert_eq!(chosen.discriminant, ActionDiscriminant::Alert);
        assert!(chosen.downgraded);
    }

    #[test]
    fn test_decision_is_deterministic() {
        for _ in 0..10 {
            let budget = ResourceBudget::new(50);
            let a = choose(0.8, &budget, DefensePosture::Standard, false);
            let budget2 = ResourceBudget::new(50);
            let b = choose(0.8, &budget2, DefensePosture::Standard, false);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_rule_cost_multiplier_applies() {
        let mut expensive_rules = default_rules();
        expensive_rules[3].resource_cost = 10;
        let rules = RuleSet::load(expensive_rules, 2).unwrap();
        // Isolate now costs 60; budget 50 cannot afford it, nor Block (80).
        let budget = ResourceBudget::new(50);

        let chosen = choose_action(
            0.95,
            &rules,
            &open_jurisdiction(),
            &ActionCosts::default(),
            &budget,
            DefensePosture::Standard,
            0.4,
            false,
        )
        .unwrap();

        assert_eq!(chosen.discriminant, ActionDiscriminant::Alert);
        assert!(chosen.forced_alert);
        // Forced alert drains the alert charge (1 * 10).
        assert_eq!(budget.available(), 40);
    }

    #[test]
    fn test_select_target_majority_entity() {
        let mk = |entity: &str, ts: u64| Signal {
            id: SignalId::generate(),
            source_entity: EntityId::new(entity),
            kind: SignalKind::PortScan,
            timestamp_ms: ts,
            attributes: BTreeMap::new(),
            confidence: 0.9,
        };
        let signals = vec![mk("attacker", 0), mk("attacker", 1), mk("victim", 2)];
        let mut incident = Incident::open(IncidentId(1), &signals[0]);
        incident.affected_entities =
            BTreeSet::from([EntityId::new("attacker"), EntityId::new("victim")]);
        for s in &signals[1..] {
            incident.member_signal_ids.insert(s.id);
        }
        let view = IncidentView { incident, signals };

        assert_eq!(select_target(&view), EntityId::new("attacker"));
    }
}
