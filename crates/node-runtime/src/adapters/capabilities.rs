//! Default capability implementations.
//!
//! Production deployments swap these for real integrations (a trained
//! model, EDR/firewall handlers, a network transport); the defaults keep a
//! standalone node functional and honest about what it can do.

use async_trait::async_trait;
use shared_types::{
    ActionId, DispatchError, FederationError, FederationMessage, NodeId, Outcome, ResponseAction,
    ScoringError,
};
use sm_03_scorer::ports::outbound::ScoringCapability;
use sm_05_response::ports::outbound::ActionHandler;
use sm_06_federation::ports::outbound::FederationTransport;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Baseline scoring model: a fixed-weight combination of the assembled
/// features, squashed into [0, 1].
///
/// Stands in for the external ML capability; it is deterministic and
/// explainable, which the correlation tests rely on.
pub struct HeuristicScoringModel;

impl ScoringCapability for HeuristicScoringModel {
    fn evaluate(&self, features: &BTreeMap<String, f64>) -> Result<f64, ScoringError> {
        let get = |name: &str| features.get(name).copied().unwrap_or(0.0);

        let mut x = 0.0;
        x += 0.9 * get("max_confidence");
        x += 0.4 * get("mean_confidence");
        x += 1.2 * get("decoy_interaction");
        x += 0.8 * get("peer_corroboration");
        x += 0.25 * get("burst_rate").min(4.0);
        x += 0.15 * (get("entity_count") - 1.0).max(0.0).min(4.0);
        x += 0.5 * get("kind_exfil_pattern_count").min(3.0);
        x += 0.2 * get("kind_auth_failure_count").min(5.0);
        x += 0.15 * get("kind_port_scan_count").min(5.0);

        // Monotone squash keeps the result in [0, 1).
        Ok(x / (1.0 + x))
    }
}

/// Action handler that records the action in the log and reports success.
///
/// Registered for every variant by default; real enforcement handlers
/// (EDR, firewall, deception network) are wired in per deployment.
pub struct LoggingActionHandler;

#[async_trait]
impl ActionHandler for LoggingActionHandler {
    async fn apply(
        &self,
        action: &ResponseAction,
        idempotency_key: ActionId,
    ) -> Result<Outcome, DispatchError> {
        info!(
            action = %idempotency_key,
            incident = %action.incident_id,
            kind = ?action.kind,
            rule = %action.justification.rule_id,
            score = action.justification.score_value,
            "Response action applied (logging handler)"
        );
        Ok(Outcome::Success)
    }
}

/// Type-erasing wrapper so the container stays non-generic over the
/// transport choice.
pub struct DynTransport {
    inner: Arc<dyn FederationTransport>,
}

impl DynTransport {
    pub fn new(inner: Arc<dyn FederationTransport>) -> Self {
        Self { inner }
    }

    /// Standalone-node default: no peers reachable.
    pub fn disconnected() -> Self {
        Self::new(Arc::new(DisconnectedTransport))
    }
}

#[async_trait]
impl FederationTransport for DynTransport {
    async fn send(&self, peer: NodeId, message: FederationMessage) -> Result<(), FederationError> {
        self.inner.send(peer, message).await
    }
}

/// Transport for nodes running without a federation network.
struct DisconnectedTransport;

#[async_trait]
impl FederationTransport for DisconnectedTransport {
    async fn send(&self, peer: NodeId, _message: FederationMessage) -> Result<(), FederationError> {
        debug!(peer = %peer, "No federation transport configured, message dropped");
        Err(FederationError::Transport("no transport configured".to_string()))
    }
}
