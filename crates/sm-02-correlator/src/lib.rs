//! # Correlator Subsystem (sm-02)
//!
//! Groups accepted signals into incidents using a sliding time window per
//! affected entity.
//!
//! ## Architecture Role
//!
//! ```text
//! [Signal Bus (1)] ──deliver──→ [Correlator (2)] ──IncidentUpdated──→ [Scorer (3)]
//!                                      │
//!                                      └──IncidentClosed──→ [Federation (6)]
//! ```
//!
//! ## Invariants
//!
//! - An incident's member set is never empty.
//! - A closed incident never mutates.
//! - Merges are deterministic: the lower-numbered incident id survives,
//!   regardless of signal arrival order.
//!
//! ## Concurrency
//!
//! Member-set mutation is serialized per incident (one mutex per incident,
//! acquired in ascending id order during merges, so merge-of-merges cannot
//! deadlock). Candidate selection re-validates under the incident locks and
//! retries if a concurrent merge won the race.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{CorrelationConfig, CorrelatorStats};
pub use ports::inbound::CorrelatorApi;
pub use service::CorrelatorService;
