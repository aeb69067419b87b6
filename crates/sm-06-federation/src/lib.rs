//! # Federation Coordinator Subsystem (sm-06)
//!
//! Exchanges signed incident digests and aggregate score statistics with
//! peer defense nodes over a gossip protocol. No node is authoritative.
//!
//! ## Architecture Role
//!
//! ```text
//! [Correlator (2)] ──IncidentClosed──→ [Federation (6)] ──gossip (fanout)──→ peers
//!                                            │
//!                                            ↓ verified digests
//!                                   [peer-intel store] ──corroboration──→ [Scorer (3)]
//! ```
//!
//! ## Trust Boundary
//!
//! - Outbound messages carry digests only, never raw signals.
//! - Inbound messages are verified against the sender's registered key;
//!   unverifiable messages are discarded and counted, and the sender's
//!   trust counter is decremented. Nothing more.
//! - Peer intelligence only feeds a scoring feature; it never overrides a
//!   local score or decision.
//!
//! ## Partition Tolerance
//!
//! Transport is best-effort (gossip tolerates loss). A partitioned node
//! keeps operating; on reconnection peers exchange current summaries, and
//! already-closed local incidents are never re-scored.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{FederationConfig, FederationStats};
pub use ports::inbound::FederationApi;
pub use service::FederationService;
