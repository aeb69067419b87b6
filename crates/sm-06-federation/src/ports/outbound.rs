//! Outbound ports (SPI) for the Federation Coordinator subsystem.

use async_trait::async_trait;
use shared_types::{FederationError, FederationMessage, IncidentDigest, NodeId};

/// Point-to-point delivery to a named peer. Best-effort: gossip tolerates
/// loss, so senders log and move on.
#[async_trait]
pub trait FederationTransport: Send + Sync {
    async fn send(&self, peer: NodeId, message: FederationMessage) -> Result<(), FederationError>;
}

/// Event notifications emitted by the Federation Coordinator.
pub trait FederationEventSink: Send + Sync {
    /// A verified digest entered the intelligence store.
    fn digest_received(&self, origin: NodeId, digest: &IncidentDigest);

    /// An incoming message failed verification and was discarded.
    fn message_rejected(&self, origin: NodeId);
}

/// Clock abstraction.
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Default time source using system time.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
