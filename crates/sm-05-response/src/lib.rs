//! # Response Orchestrator Subsystem (sm-05)
//!
//! Executes decided actions through pluggable action handlers, off the hot
//! ingestion path.
//!
//! ## Architecture Role
//!
//! ```text
//! [Policy (4)] ──try_enqueue──→ [bounded queue] ──worker──→ [ActionHandler]
//!                    │                                            │
//!                    └── QueueSaturated (throttle upstream)       │
//!                                                  DispatchCompleted events
//! ```
//!
//! ## Guarantees
//!
//! - Handlers may block or be slow; they never stall ingestion (bounded
//!   queue, saturation surfaces upstream as a throttle signal).
//! - Transient failures retry up to a fixed bound with exponential
//!   backoff, then record a terminal `Failed` outcome; the incident still
//!   progresses.
//! - Dispatch is idempotent from the engine's side: the action id is the
//!   idempotency key handed to handlers, and an action that already
//!   succeeded is never re-applied.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{ResponseConfig, ResponseStats, RetryPolicy};
pub use ports::inbound::DispatchApi;
pub use ports::outbound::ActionHandler;
pub use service::ResponseOrchestrator;
