//! Inbound ports (API) for the Federation Coordinator subsystem.

use crate::domain::FederationStats;
use async_trait::async_trait;
use shared_types::{EntityId, FederationError, FederationMessage, IncidentDigest};
use std::collections::BTreeSet;

/// Primary federation API.
#[async_trait]
pub trait FederationApi: Send + Sync {
    /// Buffer a closed-incident digest for the next broadcast tick.
    fn buffer_digest(&self, digest: IncidentDigest);

    /// Broadcast buffered digests to a random peer subset. Returns the
    /// number of peers reached (best-effort).
    async fn broadcast_tick(&self) -> usize;

    /// Handle a message from the federation transport: verify, store,
    /// forward.
    async fn handle_incoming(&self, message: FederationMessage) -> Result<(), FederationError>;

    /// Corroboration strength for a set of entities (the Scorer's
    /// `peer_corroboration` feature).
    fn corroboration_for(&self, entities: &BTreeSet<EntityId>) -> f64;

    fn stats(&self) -> FederationStats;
}
