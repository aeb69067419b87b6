//! # Signal Bus Subsystem (sm-01)
//!
//! Ingests timestamped signals from sensors, validates and deduplicates
//! them, and buffers them per entity for ordered delivery to the Correlator.
//!
//! ## Architecture Role
//!
//! ```text
//! [Sensors] ──ingest()──→ [Signal Bus (1)] ──deliver──→ [Correlator (2)]
//!                               │
//!                               ↓ SignalAccepted / SignalRejected / SignalDropped
//!                          [Event Bus]
//! ```
//!
//! ## Backpressure
//!
//! Per-entity FIFO buffers are bounded. On overflow the OLDEST unconsumed
//! signal of that entity is dropped and a `SignalDropped` event is emitted —
//! a drop is always countable, never silent.
//!
//! ## Ordering
//!
//! Delivery preserves arrival order per source entity. Ordering across
//! different entities is not guaranteed.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{IngestStats, SignalBusConfig};
pub use ports::inbound::SignalIngestApi;
pub use service::SignalBusService;
