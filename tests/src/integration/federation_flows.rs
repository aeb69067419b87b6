//! # Federation Integration Flows
//!
//! Tests that two wired nodes exchange verified incident digests over an
//! in-process transport, and that unverifiable messages never influence
//! local state.

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use uuid::Uuid;

    use node_runtime::adapters::NodeFederation;
    use node_runtime::container::{NodeConfig, SubsystemContainer};
    use shared_crypto::Ed25519Identity;
    use shared_types::{
        EntityId, FederationError, FederationMessage, FederationPayload, IncidentDigest,
        IncidentId, NodeId, ScoreSummary,
    };
    use sm_06_federation::ports::outbound::FederationTransport;
    use sm_06_federation::FederationApi;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// In-process transport routing messages to registered federation
    /// services by node id.
    #[derive(Default)]
    struct InProcessRouter {
        nodes: Mutex<BTreeMap<NodeId, Arc<NodeFederation>>>,
    }

    impl InProcessRouter {
        fn register(&self, node_id: NodeId, federation: Arc<NodeFederation>) {
            self.nodes.lock().insert(node_id, federation);
        }
    }

    #[async_trait]
    impl FederationTransport for InProcessRouter {
        async fn send(
            &self,
            peer: NodeId,
            message: FederationMessage,
        ) -> Result<(), FederationError> {
            let target = self
                .nodes
                .lock()
                .get(&peer)
                .cloned()
                .ok_or(FederationError::UnknownPeer(peer))?;
            // Delivery result mirrors the receiver's verdict; gossip
            // callers ignore it either way.
            target.handle_incoming(message).await
        }
    }

    const SEED_A: [u8; 32] = [0xA1; 32];
    const SEED_B: [u8; 32] = [0xB2; 32];

    fn node_config(own_seed: [u8; 32], peer_seed: [u8; 32]) -> NodeConfig {
        let peer_id = Ed25519Identity::from_seed(peer_seed).node_id();
        let mut config = NodeConfig::default();
        config.node.identity_seed_hex = Some(hex::encode(own_seed));
        config.federation.peers = vec![hex::encode(peer_id.as_bytes())];
        config
    }

    fn two_connected_nodes() -> (SubsystemContainer, SubsystemContainer, Arc<InProcessRouter>) {
        let router = Arc::new(InProcessRouter::default());

        let node_a = SubsystemContainer::with_transport(
            node_config(SEED_A, SEED_B),
            Some(Arc::clone(&router) as Arc<dyn FederationTransport>),
        )
        .expect("node A");
        let node_b = SubsystemContainer::with_transport(
            node_config(SEED_B, SEED_A),
            Some(Arc::clone(&router) as Arc<dyn FederationTransport>),
        )
        .expect("node B");

        router.register(node_a.node_id, Arc::clone(&node_a.federation));
        router.register(node_b.node_id, Arc::clone(&node_b.federation));

        (node_a, node_b, router)
    }

    fn digest(entity: &str, severity: f64) -> IncidentDigest {
        IncidentDigest {
            incident_id: IncidentId(11),
            affected_entities: BTreeSet::from([EntityId::new(entity)]),
            severity,
            kind_counts: BTreeMap::from([("exfil_pattern".to_string(), 4)]),
            closed_at_ms: 1_700_000_000_000,
        }
    }

    // =============================================================================
    // INTEGRATION TESTS: VERIFIED GOSSIP
    // =============================================================================

    #[tokio::test]
    async fn test_closed_incident_digest_reaches_peer() {
        let (node_a, node_b, _router) = two_connected_nodes();

        node_a.federation.buffer_digest(digest("172.16.0.8", 0.85));
        let reached = node_a.federation.broadcast_tick().await;
        assert_eq!(reached, 1);

        // Node B verified the message and its intel now corroborates the
        // entity for the local Scorer.
        let entities = BTreeSet::from([EntityId::new("172.16.0.8")]);
        assert!(node_b.federation.corroboration_for(&entities) > 0.0);
        assert_eq!(node_b.federation.stats().messages_received, 1);

        // Corroboration is a feature input, not an override: node B has no
        // incidents and no scores because of it.
        assert_eq!(
            sm_02_correlator::CorrelatorApi::stats(&*node_b.correlator).open_incidents,
            0
        );
    }

    #[tokio::test]
    async fn test_partition_does_not_block_local_pipeline() {
        // Node A gossips into the void: no peers registered on the router.
        let router = Arc::new(InProcessRouter::default());
        let node_a = SubsystemContainer::with_transport(
            node_config(SEED_A, SEED_B),
            Some(router as Arc<dyn FederationTransport>),
        )
        .expect("node A");

        node_a.federation.buffer_digest(digest("10.0.0.1", 0.7));
        let reached = node_a.federation.broadcast_tick().await;

        // Nothing reached, nothing broke.
        assert_eq!(reached, 0);
        assert_eq!(node_a.federation.stats().messages_sent, 0);
    }

    // =============================================================================
    // INTEGRATION TESTS: TRUST BOUNDARY
    // =============================================================================

    #[tokio::test]
    async fn test_forged_message_rejected_and_inert() {
        let (_node_a, node_b, _router) = two_connected_nodes();

        // A message claiming to be node A but signed by an impostor key.
        let impostor = Ed25519Identity::from_seed([0xEE; 32]);
        let claimed_origin = Ed25519Identity::from_seed(SEED_A).node_id();
        let payload = FederationPayload {
            message_id: Uuid::new_v4(),
            node_id: claimed_origin,
            digests: vec![digest("172.16.0.8", 0.99)],
            score_summary: ScoreSummary::default(),
        };
        let bytes = payload.signable_bytes().unwrap();
        let forged = FederationMessage {
            signature: impostor.sign(&bytes).to_vec(),
            payload,
        };

        let result = node_b.federation.handle_incoming(forged).await;
        assert!(matches!(
            result,
            Err(FederationError::VerificationFailed(_))
        ));

        // Discarded and counted; the sender's trust dropped; no local
        // state was altered.
        let stats = node_b.federation.stats();
        assert_eq!(stats.messages_rejected, 1);
        assert_eq!(stats.messages_received, 0);
        assert_eq!(node_b.federation.trust_of(&claimed_origin), -1);

        let entities = BTreeSet::from([EntityId::new("172.16.0.8")]);
        assert_eq!(node_b.federation.corroboration_for(&entities), 0.0);
    }

    #[tokio::test]
    async fn test_tampered_payload_rejected() {
        let (node_a, node_b, _router) = two_connected_nodes();

        // Legitimately signed by A...
        let identity_a = Ed25519Identity::from_seed(SEED_A);
        let payload = FederationPayload {
            message_id: Uuid::new_v4(),
            node_id: node_a.node_id,
            digests: vec![digest("10.1.1.1", 0.2)],
            score_summary: ScoreSummary::default(),
        };
        let bytes = payload.signable_bytes().unwrap();
        let signature = identity_a.sign(&bytes).to_vec();

        // ...then tampered in flight.
        let mut tampered_payload = payload;
        tampered_payload.digests[0].severity = 0.99;
        let tampered = FederationMessage {
            payload: tampered_payload,
            signature,
        };

        let result = node_b.federation.handle_incoming(tampered).await;
        assert!(matches!(
            result,
            Err(FederationError::VerificationFailed(_))
        ));
    }
}
