//! # Subsystem Container
//!
//! Builds every subsystem service with its adapters, in dependency order:
//!
//! 1. Shared infrastructure: event bus, clock, node identity
//! 2. Federation (feeds the Scorer's corroboration feature)
//! 3. Response Orchestrator (feeds the Policy Engine's gateway)
//! 4. Policy Engine
//! 5. Scorer
//! 6. Correlator
//! 7. Signal Bus (delivers into the Correlator)

use anyhow::Context;
use shared_bus::InMemoryEventBus;
use shared_crypto::{Ed25519Identity, NodeSigner, SignatureCapability};
use shared_types::{ActionDiscriminant, NodeId};
use sm_01_signal_bus::SignalBusService;
use sm_02_correlator::CorrelatorService;
use sm_03_scorer::ScorerService;
use sm_04_policy_engine::PolicyService;
use sm_05_response::{ports::outbound::ActionHandler, ResponseOrchestrator};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::adapters::{
    BusEventAdapter, CorrelationSinkAdapter, DispatchGatewayAdapter, DynTransport,
    HeuristicScoringModel, LoggingActionHandler, NodeFederation, PeerIntelAdapter, WallClock,
};
use crate::container::NodeConfig;

/// Concrete service types for a wired node.
pub type NodeSignalBus = SignalBusService<CorrelationSinkAdapter, BusEventAdapter, WallClock>;
pub type NodeCorrelator = CorrelatorService<BusEventAdapter>;
pub type NodeScorer =
    ScorerService<HeuristicScoringModel, PeerIntelAdapter, BusEventAdapter, WallClock>;
pub type NodePolicy = PolicyService<DispatchGatewayAdapter, BusEventAdapter, WallClock>;
pub type NodeResponse = ResponseOrchestrator<BusEventAdapter>;

/// All initialized subsystems of one defense node.
pub struct SubsystemContainer {
    pub config: NodeConfig,
    pub node_id: NodeId,
    pub started_at: Instant,
    pub bus: Arc<InMemoryEventBus>,
    pub clock: Arc<WallClock>,
    pub signal_bus: Arc<NodeSignalBus>,
    pub correlator: Arc<NodeCorrelator>,
    pub scorer: Arc<NodeScorer>,
    pub policy: Arc<NodePolicy>,
    pub response: Arc<NodeResponse>,
    pub federation: Arc<NodeFederation>,
}

impl SubsystemContainer {
    /// Wire all subsystems from configuration, with no federation
    /// transport (standalone node).
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        Self::with_transport(config, None)
    }

    /// Wire all subsystems, injecting a federation transport (deployments
    /// and multi-node tests provide one; `None` leaves the node
    /// disconnected).
    pub fn with_transport(
        config: NodeConfig,
        transport: Option<Arc<dyn sm_06_federation::ports::outbound::FederationTransport>>,
    ) -> anyhow::Result<Self> {
        let bus = Arc::new(InMemoryEventBus::new());
        let events = Arc::new(BusEventAdapter::new(Arc::clone(&bus)));
        let clock = Arc::new(WallClock);

        // Node identity: configured seed or a fresh one.
        let identity = match config.identity_seed().context("identity seed")? {
            Some(seed) => Ed25519Identity::from_seed(seed),
            None => {
                let identity = Ed25519Identity::generate();
                warn!("No identity seed configured, generated ephemeral node id");
                identity
            }
        };
        let signer = Arc::new(NodeSigner::new(identity));
        let node_id = signer.local_node_id();
        info!(node = %node_id, "Node identity ready");

        // Federation first: the Scorer reads its intel store.
        let transport = match transport {
            Some(inner) => DynTransport::new(inner),
            None => DynTransport::disconnected(),
        };
        let federation = Arc::new(NodeFederation::new(
            config.federation_config(),
            Arc::new(transport),
            Arc::clone(&signer),
            Arc::clone(&events),
            Arc::clone(&clock),
        ));
        for peer in config.peer_ids().context("federation peers")? {
            match signer.keyring().register(peer) {
                Ok(()) => federation.register_peer(peer),
                Err(e) => warn!(peer = %peer, error = %e, "Skipping peer with invalid key"),
            }
        }

        // Response Orchestrator with the default logging handlers.
        let handler: Arc<dyn ActionHandler> = Arc::new(LoggingActionHandler);
        let mut handlers: HashMap<ActionDiscriminant, Arc<dyn ActionHandler>> = HashMap::new();
        for variant in [
            ActionDiscriminant::Alert,
            ActionDiscriminant::Deceive,
            ActionDiscriminant::Isolate,
            ActionDiscriminant::Block,
        ] {
            handlers.insert(variant, Arc::clone(&handler));
        }
        let response = Arc::new(NodeResponse::new(
            config.response_config(),
            handlers,
            Arc::clone(&events),
        ));

        let policy = Arc::new(
            NodePolicy::new(
                config.policy_config().context("policy config")?,
                config.posture_override().context("posture")?,
                Arc::new(DispatchGatewayAdapter::new(Arc::clone(&response))),
                Arc::clone(&events),
                Arc::clone(&clock),
            )
            .context("policy rule set")?,
        );

        let scorer = Arc::new(NodeScorer::new(
            config.scorer_config(),
            Arc::new(HeuristicScoringModel),
            Arc::new(PeerIntelAdapter::new(Arc::clone(&federation))),
            Arc::clone(&events),
            Arc::clone(&clock),
        ));

        let correlator = Arc::new(NodeCorrelator::new(
            config.correlation_config(),
            Arc::clone(&events),
        ));

        let signal_bus = Arc::new(NodeSignalBus::new(
            config.signal_bus_config(),
            Arc::new(CorrelationSinkAdapter::new(Arc::clone(&correlator))),
            Arc::clone(&events),
            Arc::clone(&clock),
        ));

        info!("All subsystems wired");
        Ok(Self {
            config,
            node_id,
            started_at: Instant::now(),
            bus,
            clock,
            signal_bus,
            correlator,
            scorer,
            policy,
            response,
            federation,
        })
    }
}
