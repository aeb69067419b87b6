//! # Federation Coordinator Service
//!
//! Implements [`FederationApi`]: signed digest broadcast, gossip forwarding
//! with deduplication, signature verification with trust accounting, and
//! the peer-intelligence store behind the Scorer's corroboration feature.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    select_gossip_peers, FederationConfig, FederationStats, PeerIntelStore, SeenMessageCache,
    TrustLedger,
};
use crate::ports::inbound::FederationApi;
use crate::ports::outbound::{FederationEventSink, FederationTransport, TimeSource};
use shared_crypto::SignatureCapability;
use shared_types::{
    EntityId, FederationError, FederationMessage, FederationPayload, IncidentDigest, NodeId,
    ScoreSummary,
};
use std::collections::BTreeSet;

/// Federation Coordinator service.
///
/// Dependencies:
/// - `N: FederationTransport` - point-to-point peer delivery
/// - `S: SignatureCapability` - signing/verification (shared-crypto)
/// - `E: FederationEventSink` - pipeline event notifications
/// - `T: TimeSource` - clock for intel aging
pub struct FederationService<N, S, E, T>
where
    N: FederationTransport,
    S: SignatureCapability,
    E: FederationEventSink,
    T: TimeSource,
{
    config: FederationConfig,
    peers: RwLock<Vec<NodeId>>,
    pending: Mutex<Vec<IncidentDigest>>,
    seen: SeenMessageCache,
    trust: TrustLedger,
    intel: PeerIntelStore,
    transport: Arc<N>,
    signer: Arc<S>,
    events: Arc<E>,
    time: Arc<T>,
    sent: AtomicU64,
    received: AtomicU64,
    rejected: AtomicU64,
}

impl<N, S, E, T> FederationService<N, S, E, T>
where
    N: FederationTransport,
    S: SignatureCapability,
    E: FederationEventSink,
    T: TimeSource,
{
    pub fn new(
        config: FederationConfig,
        transport: Arc<N>,
        signer: Arc<S>,
        events: Arc<E>,
        time: Arc<T>,
    ) -> Self {
        Self {
            seen: SeenMessageCache::new(config.seen_cache_size),
            trust: TrustLedger::new(),
            intel: PeerIntelStore::new(config.intel_window_ms, config.corroboration_per_node),
            config,
            peers: RwLock::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            transport,
            signer,
            events,
            time,
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Register a known peer (its key must already be in the keyring).
    pub fn register_peer(&self, peer: NodeId) {
        let mut peers = self.peers.write();
        if !peers.contains(&peer) {
            peers.push(peer);
            self.trust.register(peer);
            info!(peer = %peer, "Federation peer registered");
        }
    }

    pub fn trust_of(&self, peer: &NodeId) -> i64 {
        self.trust.trust_of(peer)
    }

    /// Send a message to a random peer subset; best-effort.
    async fn gossip_out(&self, message: &FederationMessage, exclude: Option<NodeId>) -> usize {
        let peers = self.peers.read().clone();
        let selected = select_gossip_peers(&peers, self.config.fanout, exclude);

        let mut reached = 0usize;
        for peer in selected {
            match self.transport.send(peer, message.clone()).await {
                Ok(()) => {
                    reached += 1;
                    self.sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    // Gossip tolerates loss; a partitioned peer is not an
                    // error worth more than a debug line.
                    debug!(peer = %peer, error = %e, "Federation send failed");
                }
            }
        }
        reached
    }

    fn summarize(digests: &[IncidentDigest]) -> ScoreSummary {
        let count = digests.len() as u64;
        let mut max_severity = 0.0f64;
        let mut sum = 0.0f64;
        for digest in digests {
            max_severity = max_severity.max(digest.severity);
            sum += digest.severity;
        }
        ScoreSummary {
            incidents_closed: count,
            mean_severity: if count > 0 { sum / count as f64 } else { 0.0 },
            max_severity,
        }
    }
}

#[async_trait]
impl<N, S, E, T> FederationApi for FederationService<N, S, E, T>
where
    N: FederationTransport,
    S: SignatureCapability,
    E: FederationEventSink,
    T: TimeSource,
{
    fn buffer_digest(&self, digest: IncidentDigest) {
        let mut pending = self.pending.lock();
        pending.push(digest);
        // Bound the buffer: the oldest digests give way, the next tick
        // carries what fits.
        let excess = pending.len().saturating_sub(self.config.max_digests_per_message);
        if excess > 0 {
            pending.drain(..excess);
        }
    }

    async fn broadcast_tick(&self) -> usize {
        let digests: Vec<IncidentDigest> = std::mem::take(&mut *self.pending.lock());
        if digests.is_empty() {
            return 0;
        }

        let payload = FederationPayload {
            message_id: Uuid::new_v4(),
            node_id: self.signer.local_node_id(),
            score_summary: Self::summarize(&digests),
            digests,
        };
        let bytes = match payload.signable_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to encode federation payload");
                return 0;
            }
        };
        let message = FederationMessage {
            signature: self.signer.sign(&bytes),
            payload,
        };

        // Never re-forward our own broadcast when it gossips back.
        self.seen.mark_seen(message.message_id());

        let reached = self.gossip_out(&message, None).await;
        info!(
            digests = message.payload.digests.len(),
            reached, "Federation broadcast"
        );
        reached
    }

    async fn handle_incoming(&self, message: FederationMessage) -> Result<(), FederationError> {
        let origin = message.origin();

        if self.seen.has_seen(&message.message_id()) {
            debug!(message = %message.message_id(), "Duplicate gossip message ignored");
            return Ok(());
        }

        let bytes = message.payload.signable_bytes()?;
        if !self.signer.verify(&bytes, &message.signature, origin) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            let trust = self.trust.decrement(origin);
            self.events.message_rejected(origin);
            warn!(origin = %origin, trust, "Federation message failed verification, discarded");
            return Err(FederationError::VerificationFailed(origin));
        }

        self.seen.mark_seen(message.message_id());
        self.received.fetch_add(1, Ordering::Relaxed);

        let now = self.time.now_ms();
        for digest in &message.payload.digests {
            self.intel.store(origin, digest, now);
            self.events.digest_received(origin, digest);
        }
        debug!(
            origin = %origin,
            digests = message.payload.digests.len(),
            "Federation message accepted"
        );

        // Forward to a bounded random subset, excluding the origin.
        self.gossip_out(&message, Some(origin)).await;
        Ok(())
    }

    fn corroboration_for(&self, entities: &BTreeSet<EntityId>) -> f64 {
        self.intel.corroboration_for(entities, self.time.now_ms())
    }

    fn stats(&self) -> FederationStats {
        FederationStats {
            messages_sent: self.sent.load(Ordering::Relaxed),
            messages_received: self.received.load(Ordering::Relaxed),
            messages_rejected: self.rejected.load(Ordering::Relaxed),
            known_peers: self.peers.read().len(),
        }
    }
}
