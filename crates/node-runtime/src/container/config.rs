//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters,
//! loaded from a TOML file and overridable through `SM_*` environment
//! variables.

use serde::Deserialize;
use shared_types::{ActionDiscriminant, PolicyRule, RuleId};
use sm_01_signal_bus::SignalBusConfig;
use sm_02_correlator::CorrelationConfig;
use sm_03_scorer::ScorerConfig;
use sm_04_policy_engine::{DefensePosture, JurisdictionConfig, PolicyConfig};
use sm_05_response::{ResponseConfig, RetryPolicy};
use sm_06_federation::FederationConfig;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node: NodeSection,
    pub signal_bus: SignalBusSection,
    pub correlator: CorrelatorSection,
    pub scorer: ScorerSection,
    pub policy: PolicySection,
    pub response: ResponseSection,
    pub federation: FederationSection,
}

impl NodeConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                toml::from_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Environment overrides for the settings operators most often tune.
    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(seed) = std::env::var("SM_NODE_SEED") {
            self.node.identity_seed_hex = Some(seed);
        }
        if let Ok(window) = std::env::var("SM_WINDOW_MS") {
            self.correlator.window_ms = window
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("SM_WINDOW_MS={window}")))?;
        }
        if let Ok(capacity) = std::env::var("SM_BUDGET_CAPACITY") {
            self.policy.budget_capacity = capacity
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("SM_BUDGET_CAPACITY={capacity}")))?;
        }
        Ok(())
    }

    /// Decode the node identity seed, if configured.
    pub fn identity_seed(&self) -> Result<Option<[u8; 32]>, ConfigError> {
        let Some(hex_seed) = &self.node.identity_seed_hex else {
            return Ok(None);
        };
        let bytes = hex::decode(hex_seed)
            .map_err(|_| ConfigError::Invalid("identity seed is not hex".to_string()))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| {
            ConfigError::Invalid("identity seed must be 32 bytes (64 hex chars)".to_string())
        })?;
        Ok(Some(seed))
    }

    pub fn signal_bus_config(&self) -> SignalBusConfig {
        SignalBusConfig {
            max_buffer_per_entity: self.signal_bus.max_buffer_per_entity,
            seen_cache_size: self.signal_bus.seen_cache_size,
            max_future_skew_ms: self.signal_bus.max_future_skew_ms,
        }
    }

    pub fn correlation_config(&self) -> CorrelationConfig {
        CorrelationConfig {
            window_ms: self.correlator.window_ms,
            closed_retention: self.correlator.closed_retention,
        }
    }

    pub fn scorer_config(&self) -> ScorerConfig {
        ScorerConfig {
            cache_size: self.scorer.cache_size,
            max_factors: self.scorer.max_factors,
        }
    }

    pub fn policy_config(&self) -> Result<PolicyConfig, ConfigError> {
        let rules = if self.policy.rules.is_empty() {
            sm_04_policy_engine::domain::default_rules()
        } else {
            self.policy
                .rules
                .iter()
                .map(RuleSection::to_rule)
                .collect::<Result<Vec<_>, _>>()?
        };

        let defaults = PolicyConfig::default();
        Ok(PolicyConfig {
            rules,
            rules_version: self.policy.rules_version,
            budget_capacity: self.policy.budget_capacity,
            jurisdiction: JurisdictionConfig::with_tags(self.policy.jurisdiction_tags.clone()),
            alert_floor: self.policy.alert_floor,
            isolate_duration_ms: self.policy.isolate_duration_ms,
            deceive_profile: self.policy.deceive_profile.clone(),
            ..defaults
        })
    }

    pub fn posture_override(&self) -> Result<Option<DefensePosture>, ConfigError> {
        match self.policy.posture.as_deref() {
            None | Some("auto") => Ok(None),
            Some("passive") => Ok(Some(DefensePosture::Passive)),
            Some("standard") => Ok(Some(DefensePosture::Standard)),
            Some("aggressive") => Ok(Some(DefensePosture::Aggressive)),
            Some("paranoid") => Ok(Some(DefensePosture::Paranoid)),
            Some(other) => Err(ConfigError::Invalid(format!("unknown posture {other:?}"))),
        }
    }

    pub fn response_config(&self) -> ResponseConfig {
        ResponseConfig {
            queue_capacity: self.response.queue_capacity,
            retry: RetryPolicy {
                max_attempts: self.response.max_attempts,
                base_delay_ms: self.response.base_delay_ms,
                max_delay_ms: self.response.max_delay_ms,
            },
            outcome_retention: self.response.outcome_retention,
        }
    }

    pub fn federation_config(&self) -> FederationConfig {
        FederationConfig {
            fanout: self.federation.fanout,
            seen_cache_size: self.federation.seen_cache_size,
            intel_window_ms: self.federation.intel_window_ms,
            corroboration_per_node: self.federation.corroboration_per_node,
            max_digests_per_message: self.federation.max_digests_per_message,
        }
    }

    /// Decode the configured peer node ids.
    pub fn peer_ids(&self) -> Result<Vec<shared_types::NodeId>, ConfigError> {
        self.federation
            .peers
            .iter()
            .map(|hex_id| {
                let bytes = hex::decode(hex_id)
                    .map_err(|_| ConfigError::Invalid(format!("peer id not hex: {hex_id}")))?;
                let id: [u8; 32] = bytes.try_into().map_err(|_| {
                    ConfigError::Invalid(format!("peer id must be 32 bytes: {hex_id}"))
                })?;
                Ok(shared_types::NodeId::new(id))
            })
            .collect()
    }
}

/// Node identity and logging.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Hex-encoded 32-byte Ed25519 seed. Generated fresh when absent
    /// (a restart then changes the node id).
    pub identity_seed_hex: Option<String>,
    pub log_level: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            identity_seed_hex: None,
            log_level: "info".to_string(),
        }
    }
}

/// Signal Bus settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalBusSection {
    pub max_buffer_per_entity: usize,
    pub seen_cache_size: usize,
    pub max_future_skew_ms: u64,
    /// Delivery pump interval.
    pub pump_interval_ms: u64,
}

impl Default for SignalBusSection {
    fn default() -> Self {
        let defaults = SignalBusConfig::default();
        Self {
            max_buffer_per_entity: defaults.max_buffer_per_entity,
            seen_cache_size: defaults.seen_cache_size,
            max_future_skew_ms: defaults.max_future_skew_ms,
            pump_interval_ms: 50,
        }
    }
}

/// Correlator settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorrelatorSection {
    /// Sliding window W.
    pub window_ms: u64,
    pub sweep_interval_ms: u64,
    pub closed_retention: usize,
}

impl Default for CorrelatorSection {
    fn default() -> Self {
        let defaults = CorrelationConfig::default();
        Self {
            window_ms: defaults.window_ms,
            sweep_interval_ms: 5_000,
            closed_retention: defaults.closed_retention,
        }
    }
}

/// Scorer settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScorerSection {
    pub cache_size: usize,
    pub max_factors: usize,
}

impl Default for ScorerSection {
    fn default() -> Self {
        let defaults = ScorerConfig::default();
        Self {
            cache_size: defaults.cache_size,
            max_factors: defaults.max_factors,
        }
    }
}

/// Policy Engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// Empty = built-in default partition.
    pub rules: Vec<RuleSection>,
    pub rules_version: u32,
    pub budget_capacity: u64,
    pub replenish_interval_ms: u64,
    pub posture_review_interval_ms: u64,
    pub alert_floor: f64,
    pub jurisdiction_tags: Vec<String>,
    /// "auto" or a fixed posture name.
    pub posture: Option<String>,
    pub isolate_duration_ms: u64,
    pub deceive_profile: String,
}

impl Default for PolicySection {
    fn default() -> Self {
        let defaults = PolicyConfig::default();
        Self {
            rules: Vec::new(),
            rules_version: defaults.rules_version,
            budget_capacity: defaults.budget_capacity,
            replenish_interval_ms: 10_000,
            posture_review_interval_ms: 30_000,
            alert_floor: defaults.alert_floor,
            jurisdiction_tags: vec!["default".to_string()],
            posture: None,
            isolate_duration_ms: defaults.isolate_duration_ms,
            deceive_profile: defaults.deceive_profile,
        }
    }
}

/// One policy rule in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSection {
    pub id: u32,
    pub min_severity: f64,
    pub max_severity: f64,
    /// Action names: no_action, alert, deceive, isolate, block.
    pub allowed_actions: Vec<String>,
    #[serde(default = "default_rule_cost")]
    pub resource_cost: u32,
    #[serde(default = "default_legal_tag")]
    pub legal_constraint_tag: String,
}

fn default_rule_cost() -> u32 {
    1
}

fn default_legal_tag() -> String {
    "default".to_string()
}

impl RuleSection {
    fn to_rule(&self) -> Result<PolicyRule, ConfigError> {
        let mut allowed = BTreeSet::new();
        for name in &self.allowed_actions {
            let action = match name.as_str() {
                "no_action" => ActionDiscriminant::NoAction,
                "alert" => ActionDiscriminant::Alert,
                "deceive" => ActionDiscriminant::Deceive,
                "isolate" => ActionDiscriminant::Isolate,
                "block" => ActionDiscriminant::Block,
                other => {
                    return Err(ConfigError::Invalid(format!("unknown action {other:?}")));
                }
            };
            allowed.insert(action);
        }
        Ok(PolicyRule {
            id: RuleId(self.id),
            min_severity: self.min_severity,
            max_severity: self.max_severity,
            allowed_actions: allowed,
            resource_cost: self.resource_cost,
            legal_constraint_tag: self.legal_constraint_tag.clone(),
        })
    }
}

/// Response Orchestrator settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResponseSection {
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub outcome_retention: usize,
}

impl Default for ResponseSection {
    fn default() -> Self {
        let defaults = ResponseConfig::default();
        Self {
            queue_capacity: defaults.queue_capacity,
            max_attempts: defaults.retry.max_attempts,
            base_delay_ms: defaults.retry.base_delay_ms,
            max_delay_ms: defaults.retry.max_delay_ms,
            outcome_retention: defaults.outcome_retention,
        }
    }
}

/// Federation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FederationSection {
    pub enabled: bool,
    pub fanout: usize,
    pub gossip_interval_ms: u64,
    pub seen_cache_size: usize,
    pub intel_window_ms: u64,
    pub corroboration_per_node: f64,
    pub max_digests_per_message: usize,
    /// Hex-encoded peer node ids (Ed25519 verifying keys).
    pub peers: Vec<String>,
}

impl Default for FederationSection {
    fn default() -> Self {
        let defaults = FederationConfig::default();
        Self {
            enabled: true,
            fanout: defaults.fanout,
            gossip_interval_ms: 15_000,
            seen_cache_size: defaults.seen_cache_size,
            intel_window_ms: defaults.intel_window_ms,
            corroboration_per_node: defaults.corroboration_per_node,
            max_digests_per_message: defaults.max_digests_per_message,
            peers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.correlator.window_ms, 30_000);
        assert_eq!(config.policy.budget_capacity, 100);
        assert_eq!(config.federation.fanout, 4);
        // Empty rules fall back to the built-in partition.
        let policy = config.policy_config().unwrap();
        assert_eq!(policy.rules.len(), 4);
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[correlator]
window_ms = 5000

[policy]
budget_capacity = 42
jurisdiction_tags = ["default", "aggressive-response"]

[[policy.rules]]
id = 1
min_severity = 0.0
max_severity = 0.5
allowed_actions = ["no_action", "alert"]

[[policy.rules]]
id = 2
min_severity = 0.5
max_severity = 1.0
allowed_actions = ["isolate", "block"]
resource_cost = 2
legal_constraint_tag = "aggressive-response"
"#
        )
        .unwrap();

        let config = NodeConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.correlator.window_ms, 5_000);
        assert_eq!(config.policy.budget_capacity, 42);

        let policy = config.policy_config().unwrap();
        assert_eq!(policy.rules.len(), 2);
        assert_eq!(policy.rules[1].resource_cost, 2);
        assert!(policy.jurisdiction.allows("aggressive-response"));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let section = RuleSection {
            id: 1,
            min_severity: 0.0,
            max_severity: 1.0,
            allowed_actions: vec!["nuke".to_string()],
            resource_cost: 1,
            legal_constraint_tag: "default".to_string(),
        };
        assert!(section.to_rule().is_err());
    }

    #[test]
    fn test_identity_seed_roundtrip() {
        let mut config = NodeConfig::default();
        config.node.identity_seed_hex = Some(hex::encode([7u8; 32]));
        assert_eq!(config.identity_seed().unwrap(), Some([7u8; 32]));

        config.node.identity_seed_hex = Some("zz".to_string());
        assert!(config.identity_seed().is_err());
    }

    #[test]
    fn test_posture_parsing() {
        let mut config = NodeConfig::default();
        assert_eq!(config.posture_override().unwrap(), None);

        config.policy.posture = Some("passive".to_string());
        assert_eq!(
            config.posture_override().unwrap(),
            Some(DefensePosture::Passive)
        );

        config.policy.posture = Some("ballistic".to_string());
        assert!(config.posture_override().is_err());
    }

    #[test]
    fn test_peer_ids_parsing() {
        let mut config = NodeConfig::default();
        config.federation.peers = vec![hex::encode([3u8; 32])];
        let peers = config.peer_ids().unwrap();
        assert_eq!(peers.len(), 1);

        config.federation.peers = vec!["short".to_string()];
        assert!(config.peer_ids().is_err());
    }
}
