//! # Policy Engine Subsystem (sm-04)
//!
//! Maps (incident, severity score, resource budget) to a bounded response
//! action, enforcing proportionality, legal constraints, and resource-aware
//! activation.
//!
//! ## Architecture Role
//!
//! ```text
//! [Scorer (3)] ──ScoreComputed──→ [Policy Engine (4)] ──ActionDecided──→ [Response (5)]
//!                                        ↑
//!                    DispatchQueueSaturated (throttle: prefer Alert)
//! ```
//!
//! ## Guarantees
//!
//! - Policy selection is deterministic: the same (score, budget,
//!   jurisdiction) always yields the same action.
//! - Rule ranges partition [0, 1]; range ties resolve to the lowest rule id.
//! - The resource budget never goes negative; once exhausted, only
//!   Alert/NoAction are selectable until replenishment.
//! - Above the alert floor the engine never goes silent: if no action is
//!   affordable, it still emits Alert.
//! - Jurisdiction constraints only ever downgrade an action, never
//!   escalate it.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    ActionCosts, DecisionPhase, DefensePosture, JurisdictionConfig, PolicyConfig, PolicyStats,
    ResourceBudget, RuleSet,
};
pub use ports::inbound::PolicyApi;
pub use service::{Decision, PolicyService};
