//! # Error Taxonomy
//!
//! Errors shared across subsystems. Local faults are recovered in place at
//! the stage where they occur; nothing here is allowed to be fatal to the
//! process.

use crate::entities::{IncidentId, SignalId};
use crate::federation::NodeId;
use thiserror::Error;

/// Rejections at the Signal Bus ingestion boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    /// Structurally invalid signal: bad confidence, missing entity,
    /// implausible timestamp. Counted, never enters correlation.
    #[error("Malformed signal: {0}")]
    MalformedSignal(String),

    /// Signal id already seen.
    #[error("Duplicate signal: {0}")]
    DuplicateSignal(SignalId),
}

/// Correlator faults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrelationError {
    /// Attempted mutation of a closed incident.
    #[error("Incident is closed: {0}")]
    IncidentClosed(IncidentId),

    #[error("Unknown incident: {0}")]
    UnknownIncident(IncidentId),
}

/// Scorer faults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// The scoring capability failed or returned a non-finite value.
    /// The incident is scored 0 and progresses; the fault is logged.
    #[error("Scoring capability unavailable: {0}")]
    ScoringUnavailable(String),

    /// Attempted to score a closed incident.
    #[error("Cannot score closed incident: {0}")]
    IncidentClosed(IncidentId),
}

/// Policy Engine faults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// No rule range contains the score. Prevented by rule-set validation
    /// at startup; kept as a defect signal rather than a panic.
    #[error("No policy rule matches score {0}")]
    NoMatchingRule(f64),

    /// Rule set failed validation (gap, invalid range, empty).
    #[error("Invalid policy rule set: {0}")]
    InvalidRuleSet(String),
}

/// Response dispatch faults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// Retryable handler failure (timeout, transient I/O).
    #[error("Transient dispatch failure: {0}")]
    Transient(String),

    /// Non-retryable handler failure.
    #[error("Permanent dispatch failure: {0}")]
    Permanent(String),

    /// No handler registered for the action variant.
    #[error("No handler registered for action variant {0}")]
    NoHandler(String),

    /// The dispatch queue is full; surfaced upward as a throttle signal.
    #[error("Dispatch queue saturated")]
    QueueSaturated,
}

/// Federation faults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FederationError {
    /// Message signature did not verify; message dropped and counted.
    #[error("Signature verification failed for node {0}")]
    VerificationFailed(NodeId),

    /// Sender is not in the peer registry.
    #[error("Unknown peer: {0}")]
    UnknownPeer(NodeId),

    /// Best-effort transport failure (gossip tolerates loss).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}
