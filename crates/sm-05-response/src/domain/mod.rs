//! Domain logic for response dispatch.

mod outcomes;
mod retry;

pub use outcomes::OutcomeLedger;
pub use retry::RetryPolicy;

/// Response Orchestrator configuration.
#[derive(Clone, Debug)]
pub struct ResponseConfig {
    /// Bounded dispatch queue capacity.
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
    /// Completed-outcome retention (idempotency window).
    pub outcome_retention: usize,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 128,
            retry: RetryPolicy::default(),
            outcome_retention: 10_000,
        }
    }
}

/// Response counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResponseStats {
    pub dispatched: u64,
    pub failed: u64,
    pub queue_depth: usize,
}
