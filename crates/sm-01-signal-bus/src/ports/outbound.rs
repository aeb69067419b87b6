//! Outbound ports (SPI) for the Signal Bus subsystem.

use shared_types::{EntityId, Signal, SignalId};

/// Destination for accepted signals (the Correlator, behind an adapter).
pub trait CorrelationSink: Send + Sync {
    /// Hand one accepted signal to correlation. Per-entity arrival order is
    /// preserved by the caller.
    fn deliver(&self, signal: Signal);
}

/// Event notifications emitted by the Signal Bus.
pub trait IngestEventSink: Send + Sync {
    fn signal_accepted(&self, signal: &Signal);

    fn signal_rejected(&self, signal_id: Option<SignalId>, reason: &str);

    /// A backpressure drop. `total_dropped` is the entity's running count.
    fn signal_dropped(&self, entity: &EntityId, dropped: SignalId, total_dropped: u64);
}

/// Clock abstraction so timestamp validation is testable.
pub trait TimeSource: Send + Sync {
    /// Current unix time in milliseconds.
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
