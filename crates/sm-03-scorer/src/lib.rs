//! # Scorer Subsystem (sm-03)
//!
//! Computes a severity score per incident by assembling features from the
//! incident's member signals and handing them to an injected scoring
//! capability (the ML model is external; this subsystem only assembles
//! features and normalizes the result).
//!
//! ## Architecture Role
//!
//! ```text
//! [Correlator (2)] ──IncidentUpdated──→ [Scorer (3)] ──ScoreComputed──→ [Policy (4)]
//!                                            ↑
//!                         peer corroboration │ (never overrides, only a feature)
//!                                     [Federation (6)]
//! ```
//!
//! ## Determinism
//!
//! Identical incident state and an identical capability produce an
//! identical score. Results are cached per `(incident, member_version)`;
//! any member-set change invalidates the cache entry. A closed incident is
//! never scored.
//!
//! ## Fault Policy
//!
//! A failing or non-finite capability result scores the incident 0.0 and
//! records a `ScoringFault`; the pipeline continues.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{assemble_features, ScorerConfig};
pub use ports::inbound::ScorerApi;
pub use ports::outbound::ScoringCapability;
pub use service::ScorerService;
