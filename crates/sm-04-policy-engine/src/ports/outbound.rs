//! Outbound ports (SPI) for the Policy Engine subsystem.

use shared_types::{DispatchError, ResponseAction};

/// Gateway to the Response Orchestrator's dispatch queue.
pub trait DispatchGateway: Send + Sync {
    /// Enqueue an action for asynchronous dispatch.
    ///
    /// `QueueSaturated` is the backpressure signal: the caller falls back
    /// to Alert rather than blocking the pipeline.
    fn enqueue(&self, action: ResponseAction) -> Result<(), DispatchError>;
}

/// Event notifications emitted by the Policy Engine.
pub trait PolicyEventSink: Send + Sync {
    /// A decision was made (including NoAction, for the audit trail).
    fn action_decided(&self, action: &ResponseAction);

    /// An unexpected stage fault was contained.
    fn critical_fault(&self, error: &str);
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
