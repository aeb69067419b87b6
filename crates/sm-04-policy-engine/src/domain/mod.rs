//! Domain logic for policy decisions.

mod budget;
mod decision;
mod posture;
mod rules;
mod state;

pub use budget::ResourceBudget;
pub use decision::{choose_action, select_target, ChosenAction};
pub use posture::{DefensePosture, PostureController, PostureThresholds};
pub use rules::RuleSet;
pub use state::{DecisionPhase, DecisionTable};

use serde::{Deserialize, Serialize};
use shared_types::{ActionDiscriminant, BlockScope, PolicyRule, RuleId};
use std::collections::{BTreeSet, HashSet};

/// Base cost per action variant, multiplied by the matched rule's
/// `resource_cost`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionCosts {
    pub alert: u64,
    pub deceive: u64,
    pub isolate: u64,
    pub block: u64,
}

impl Default for ActionCosts {
    fn default() -> Self {
        Self {
            alert: 1,
            deceive: 4,
            isolate: 6,
            block: 8,
        }
    }
}

impl ActionCosts {
    /// Effective charge for dispatching a variant under a rule.
    pub fn charge_for(&self, action: ActionDiscriminant, rule_cost: u32) -> u64 {
        let base = match action {
            ActionDiscriminant::NoAction => 0,
            ActionDiscriminant::Alert => self.alert,
            ActionDiscriminant::Deceive => self.deceive,
            ActionDiscriminant::Isolate => self.isolate,
            ActionDiscriminant::Block => self.block,
        };
        base.saturating_mul(u64::from(rule_cost.max(1)))
    }
}

/// Enabled legal constraint tags for the node's jurisdiction.
#[derive(Clone, Debug, Default)]
pub struct JurisdictionConfig {
    pub enabled_tags: HashSet<String>,
}

impl JurisdictionConfig {
    pub fn with_tags<I: IntoIterator<Item = String>>(tags: I) -> Self {
        Self {
            enabled_tags: tags.into_iter().collect(),
        }
    }

    pub fn allows(&self, tag: &str) -> bool {
        self.enabled_tags.contains(tag)
    }
}

/// Policy Engine configuration.
#[derive(Clone, Debug)]
pub struct PolicyConfig {
    /// Versioned rule set, validated at startup.
    pub rules: Vec<PolicyRule>,
    /// Rule set version (operator bookkeeping).
    pub rules_version: u32,
    /// Budget capacity restored by each replenish tick.
    pub budget_capacity: u64,
    pub action_costs: ActionCosts,
    pub jurisdiction: JurisdictionConfig,
    /// Severity at or above which the engine must never go silent.
    pub alert_floor: f64,
    /// Actions that terminate the incident once issued.
    pub terminal_actions: BTreeSet<ActionDiscriminant>,
    /// Isolation duration applied by Isolate decisions.
    pub isolate_duration_ms: u64,
    /// Deception profile handed to Deceive decisions.
    pub deceive_profile: String,
    /// Scope applied by Block decisions.
    pub block_scope: BlockScope,
    pub posture_thresholds: PostureThresholds,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            rules_version: 1,
            budget_capacity: 100,
            action_costs: ActionCosts::default(),
            jurisdiction: JurisdictionConfig::with_tags(vec!["default".to_string()]),
            alert_floor: 0.4,
            terminal_actions: BTreeSet::from([
                ActionDiscriminant::Isolate,
                ActionDiscriminant::Block,
            ]),
            isolate_duration_ms: 15 * 60 * 1_000,
            deceive_profile: "decoy-standard".to_string(),
            block_scope: BlockScope::Host,
            posture_thresholds: PostureThresholds::default(),
        }
    }
}

/// Default severity partition. Operators replace this from configuration;
/// the defaults keep a bare node proportional.
pub fn default_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule {
            id: RuleId(1),
            min_severity: 0.0,
            max_severity: 0.4,
            allowed_actions: BTreeSet::from([
                ActionDiscriminant::NoAction,
                ActionDiscriminant::Alert,
            ]),
            resource_cost: 1,
            legal_constraint_tag: "default".to_string(),
        },
        PolicyRule {
            id: RuleId(2),
            min_severity: 0.4,
            max_severity: 0.7,
            allowed_actions: BTreeSet::from([
                ActionDiscriminant::Alert,
                ActionDiscriminant::Deceive,
            ]),
            resource_cost: 1,
            legal_constraint_tag: "default".to_string(),
        },
        PolicyRule {
            id: RuleId(3),
            min_severity: 0.7,
            max_severity: 0.9,
            allowed_actions: BTreeSet::from([
                ActionDiscriminant::Alert,
                ActionDiscriminant::Isolate,
            ]),
            resource_cost: 1,
            legal_constraint_tag: "default".to_string(),
        },
        PolicyRule {
            id: RuleId(4),
            min_severity: 0.9,
            max_severity: 1.0,
            allowed_actions: BTreeSet::from([
                ActionDiscriminant::Isolate,
                ActionDiscriminant::Block,
            ]),
            resource_cost: 1,
            legal_constraint_tag: "default".to_string(),
        },
    ]
}

/// Policy Engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PolicyStats {
    pub decisions: u64,
    /// Decisions forced down to Alert by budget or throttling.
    pub forced_alerts: u64,
    pub budget_available: u64,
}
