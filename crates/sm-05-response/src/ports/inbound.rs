//! Inbound ports (API) for the Response Orchestrator subsystem.

use crate::domain::ResponseStats;
use shared_types::{DispatchError, ResponseAction};

/// Primary dispatch API (the Policy Engine's gateway lands here).
pub trait DispatchApi: Send + Sync {
    /// Hand an action to the bounded dispatch queue without blocking.
    ///
    /// # Errors
    ///
    /// `QueueSaturated` when the queue is full — the caller treats this as
    /// the throttle signal.
    fn try_enqueue(&self, action: ResponseAction) -> Result<(), DispatchError>;

    /// Actions currently waiting in the queue.
    fn queue_depth(&self) -> usize;

    fn stats(&self) -> ResponseStats;
}
