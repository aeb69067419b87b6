//! Outbound ports (SPI) for the Response Orchestrator subsystem.

use async_trait::async_trait;
use shared_types::{ActionId, DispatchError, IncidentId, Outcome, ResponseAction};

/// External action-handler capability, one registered per action variant.
///
/// # Idempotency Contract
///
/// `idempotency_key` is stable across retries and re-dispatches of the same
/// action; handlers must not double-apply side effects for a key they have
/// already applied.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn apply(
        &self,
        action: &ResponseAction,
        idempotency_key: ActionId,
    ) -> Result<Outcome, DispatchError>;
}

/// Event notifications emitted by the Response Orchestrator.
pub trait ResponseEventSink: Send + Sync {
    fn dispatch_completed(&self, action_id: ActionId, incident_id: IncidentId, outcome: &Outcome);

    /// The queue refused an action; upstream should throttle.
    fn queue_saturated(&self, queue_depth: usize);
}
