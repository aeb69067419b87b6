//! # Domain Entities
//!
//! Core data model for the signal correlation and response pipeline.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Unique identifier of a single sensor observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignalId(pub Uuid);

impl SignalId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a correlated incident.
///
/// Incident ids are monotonically increasing within a node so that the
/// merge tie-break ("lower-numbered id survives") is total and deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub u64);

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inc-{}", self.0)
    }
}

/// Unique identifier of a dispatched response action.
///
/// Doubles as the idempotency key handed to action handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(pub Uuid);

impl ActionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a policy rule (lowest id wins on range ties).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(pub u32);

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule-{}", self.0)
    }
}

/// A network entity a signal refers to (host, address, account).
///
/// Entities are the correlation key: signals touching overlapping entities
/// within the correlation window belong to the same incident.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sensor signal taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// Port or service enumeration observed against an entity.
    PortScan,
    /// Failed authentication attempt.
    AuthFailure,
    /// Protocol-violating or truncated traffic.
    MalformedPacket,
    /// Outbound transfer matching an exfiltration pattern.
    ExfilPattern,
    /// Interaction with a deception-network decoy.
    DecoyInteraction,
    /// Host or network policy violation reported by an agent.
    PolicyViolation,
    /// Sensor-specific kind not covered by the fixed taxonomy.
    Custom(String),
}

impl SignalKind {
    /// Stable label used for feature names and digest kind counts.
    pub fn label(&self) -> &str {
        match self {
            Self::PortScan => "port_scan",
            Self::AuthFailure => "auth_failure",
            Self::MalformedPacket => "malformed_packet",
            Self::ExfilPattern => "exfil_pattern",
            Self::DecoyInteraction => "decoy_interaction",
            Self::PolicyViolation => "policy_violation",
            Self::Custom(name) => name,
        }
    }
}

/// A single normalized observation from a sensor.
///
/// Immutable once created. Produced by sensors, validated and buffered by
/// the Signal Bus, consumed by the Correlator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    /// The entity this observation is about.
    pub source_entity: EntityId,
    pub kind: SignalKind,
    /// Sensor-assigned timestamp, milliseconds since the unix epoch.
    pub timestamp_ms: u64,
    /// Free-form sensor attributes (feature inputs for the Scorer).
    pub attributes: BTreeMap<String, String>,
    /// Sensor confidence in [0, 1].
    pub confidence: f64,
}

/// Correlator-owned lifecycle of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentState {
    /// Accepting new member signals.
    Open,
    /// Frozen: inactivity or a terminal policy action closed it.
    Closed,
    /// Absorbed into another incident during a merge; the surviving
    /// incident carries the members.
    MergedInto(IncidentId),
}

/// A correlated group of signals believed to represent one threat event.
///
/// Owned exclusively by the Correlator while open. Downstream subsystems
/// only ever see an [`IncidentView`] snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    /// Never empty.
    pub member_signal_ids: BTreeSet<SignalId>,
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
    pub affected_entities: BTreeSet<EntityId>,
    pub state: IncidentState,
    /// Incremented on every member-set mutation; drives score-cache
    /// invalidation in the Scorer.
    pub member_version: u64,
}

impl Incident {
    /// Open a new incident seeded with one signal.
    pub fn open(id: IncidentId, signal: &Signal) -> Self {
        let mut members = BTreeSet::new();
        members.insert(signal.id);
        let mut entities = BTreeSet::new();
        entities.insert(signal.source_entity.clone());
        Self {
            id,
            member_signal_ids: members,
            first_seen_ms: signal.timestamp_ms,
            last_seen_ms: signal.timestamp_ms,
            affected_entities: entities,
            state: IncidentState::Open,
            member_version: 1,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == IncidentState::Open
    }
}

/// Read-only snapshot of an incident plus its member signals, handed to the
/// Scorer and Policy Engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentView {
    pub incident: Incident,
    /// The member signals at snapshot time, in `SignalId` order.
    pub signals: Vec<Signal>,
}

impl IncidentView {
    pub fn id(&self) -> IncidentId {
        self.incident.id
    }

    pub fn member_version(&self) -> u64 {
        self.incident.member_version
    }
}

/// One named weighted term contributing to a threat score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    pub weight: f64,
}

/// Normalized [0, 1] severity estimate for an incident.
///
/// Recomputed whenever the incident mutates; NOT monotonic (new information
/// can lower apparent severity). A closed incident is never scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatScore {
    pub incident_id: IncidentId,
    /// Severity in [0, 1].
    pub value: f64,
    /// Ordered contributing factors, highest weight first.
    pub contributing_factors: Vec<ScoreFactor>,
    /// The incident member version this score was computed against.
    pub member_version: u64,
    pub computed_at_ms: u64,
}

/// Scope of a Block action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockScope {
    /// Block the single entity.
    Host,
    /// Block the entity's subnet.
    Subnet,
}

/// The concrete automated action chosen for an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Take no automated action.
    NoAction,
    /// Raise a human-visible alert.
    Alert,
    /// Redirect the entity into the deception network.
    Deceive {
        target: EntityId,
        profile_id: String,
    },
    /// Quarantine the entity for a bounded duration.
    Isolate {
        target: EntityId,
        duration_ms: u64,
    },
    /// Block traffic from the entity.
    Block {
        target: EntityId,
        scope: BlockScope,
    },
}

impl ActionKind {
    pub fn discriminant(&self) -> ActionDiscriminant {
        match self {
            Self::NoAction => ActionDiscriminant::NoAction,
            Self::Alert => ActionDiscriminant::Alert,
            Self::Deceive { .. } => ActionDiscriminant::Deceive,
            Self::Isolate { .. } => ActionDiscriminant::Isolate,
            Self::Block { .. } => ActionDiscriminant::Block,
        }
    }
}

/// Variant tag of [`ActionKind`], used in rule configuration and handler
/// registration.
///
/// Declaration order IS the restrictiveness order: jurisdiction downgrades
/// move toward lower variants, never higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionDiscriminant {
    NoAction,
    Alert,
    Deceive,
    Isolate,
    Block,
}

impl ActionDiscriminant {
    /// Restrictiveness rank (higher = more intrusive to the target).
    pub fn restrictiveness(&self) -> u8 {
        match self {
            Self::NoAction => 0,
            Self::Alert => 1,
            Self::Deceive => 2,
            Self::Isolate => 3,
            Self::Block => 4,
        }
    }
}

impl std::fmt::Display for ActionDiscriminant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoAction => "no_action",
            Self::Alert => "alert",
            Self::Deceive => "deceive",
            Self::Isolate => "isolate",
            Self::Block => "block",
        };
        write!(f, "{s}")
    }
}

/// Why an action was chosen: the triggering score and the matched rule.
///
/// Every dispatched action references exactly one score that existed at
/// decision time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Justification {
    pub score_value: f64,
    pub score_computed_at_ms: u64,
    pub rule_id: RuleId,
}

/// A response decision bound to an incident, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAction {
    pub id: ActionId,
    pub incident_id: IncidentId,
    pub kind: ActionKind,
    pub justification: Justification,
}

/// Result of applying a response action through an external handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failed(String),
    PartiallyApplied,
}

/// Configuration mapping a severity range to allowed proportional responses.
///
/// Rule ranges must partition [0, 1]; where ranges touch, the lowest rule id
/// wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: RuleId,
    /// Inclusive lower severity bound.
    pub min_severity: f64,
    /// Exclusive upper severity bound (inclusive for the rule that ends
    /// at 1.0).
    pub max_severity: f64,
    pub allowed_actions: BTreeSet<ActionDiscriminant>,
    /// Cost multiplier charged against the resource budget on dispatch.
    pub resource_cost: u32,
    /// Jurisdiction tag that must be enabled for this rule's non-Alert
    /// actions to apply.
    pub legal_constraint_tag: String,
}

impl PolicyRule {
    /// Whether a score falls in this rule's range.
    pub fn contains(&self, score: f64) -> bool {
        if (self.max_severity - 1.0).abs() < f64::EPSILON {
            score >= self.min_severity && score <= self.max_severity
        } else {
            score >= self.min_severity && score < self.max_severity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signal(entity: &str, ts: u64) -> Signal {
        Signal {
            id: SignalId::generate(),
            source_entity: EntityId::new(entity),
            kind: SignalKind::PortScan,
            timestamp_ms: ts,
            attributes: BTreeMap::new(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_incident_open_seeds_one_member() {
        let signal = sample_signal("10.0.0.5", 1_000);
        let incident = Incident::open(IncidentId(1), &signal);

        assert_eq!(incident.member_signal_ids.len(), 1);
        assert!(incident.member_signal_ids.contains(&signal.id));
        assert_eq!(incident.first_seen_ms, 1_000);
        assert_eq!(incident.last_seen_ms, 1_000);
        assert!(incident.is_open());
        assert_eq!(incident.member_version, 1);
    }

    #[test]
    fn test_rule_range_boundaries() {
        let rule = PolicyRule {
            id: RuleId(1),
            min_severity: 0.4,
            max_severity: 0.7,
            allowed_actions: BTreeSet::new(),
            resource_cost: 1,
            legal_constraint_tag: "default".into(),
        };

        assert!(!rule.contains(0.39));
        assert!(rule.contains(0.4));
        assert!(rule.contains(0.699));
        assert!(!rule.contains(0.7)); // upper bound exclusive
    }

    #[test]
    fn test_terminal_rule_includes_one() {
        let rule = PolicyRule {
            id: RuleId(4),
            min_severity: 0.9,
            max_severity: 1.0,
            allowed_actions: BTreeSet::new(),
            resource_cost: 1,
            legal_constraint_tag: "default".into(),
        };

        assert!(rule.contains(1.0));
    }

    #[test]
    fn test_restrictiveness_ordering() {
        assert!(
            ActionDiscriminant::NoAction.restrictiveness()
                < ActionDiscriminant::Alert.restrictiveness()
        );
        assert!(
            ActionDiscriminant::Alert.restrictiveness()
                < ActionDiscriminant::Deceive.restrictiveness()
        );
        assert!(
            ActionDiscriminant::Deceive.restrictiveness()
                < ActionDiscriminant::Isolate.restrictiveness()
        );
        assert!(
            ActionDiscriminant::Isolate.restrictiveness()
                < ActionDiscriminant::Block.restrictiveness()
        );
    }

    #[test]
    fn test_incident_id_ordering_is_numeric() {
        assert!(IncidentId(2) < IncidentId(10));
    }
}
