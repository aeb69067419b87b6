//! Pipeline glue: adapters that connect one subsystem's outbound port to
//! the next subsystem's inbound API.

use super::{BusEventAdapter, DynTransport, WallClock};
use shared_crypto::NodeSigner;
use shared_types::{DispatchError, EntityId, ResponseAction, Signal};
use sm_02_correlator::{CorrelatorApi, CorrelatorService};
use sm_04_policy_engine::ports::outbound::DispatchGateway;
use sm_05_response::{DispatchApi, ResponseOrchestrator};
use sm_06_federation::{FederationApi, FederationService};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Concrete federation service type used by the runtime.
pub type NodeFederation = FederationService<DynTransport, NodeSigner, BusEventAdapter, WallClock>;

/// Signal Bus → Correlator.
pub struct CorrelationSinkAdapter {
    correlator: Arc<CorrelatorService<BusEventAdapter>>,
}

impl CorrelationSinkAdapter {
    pub fn new(correlator: Arc<CorrelatorService<BusEventAdapter>>) -> Self {
        Self { correlator }
    }
}

impl sm_01_signal_bus::ports::outbound::CorrelationSink for CorrelationSinkAdapter {
    fn deliver(&self, signal: Signal) {
        self.correlator.handle_signal(signal);
    }
}

/// Policy Engine → Response Orchestrator.
pub struct DispatchGatewayAdapter {
    orchestrator: Arc<ResponseOrchestrator<BusEventAdapter>>,
}

impl DispatchGatewayAdapter {
    pub fn new(orchestrator: Arc<ResponseOrchestrator<BusEventAdapter>>) -> Self {
        Self { orchestrator }
    }
}

impl DispatchGateway for DispatchGatewayAdapter {
    fn enqueue(&self, action: ResponseAction) -> Result<(), DispatchError> {
        self.orchestrator.try_enqueue(action)
    }
}

/// Federation → Scorer (corroboration feature).
pub struct PeerIntelAdapter {
    federation: Arc<NodeFederation>,
}

impl PeerIntelAdapter {
    pub fn new(federation: Arc<NodeFederation>) -> Self {
        Self { federation }
    }
}

impl sm_03_scorer::ports::outbound::PeerIntelProvider for PeerIntelAdapter {
    fn corroboration_for(&self, entities: &BTreeSet<EntityId>) -> f64 {
        self.federation.corroboration_for(entities)
    }
}
