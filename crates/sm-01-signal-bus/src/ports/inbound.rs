//! Inbound ports (API) for the Signal Bus subsystem.

use crate::domain::IngestStats;
use shared_types::{IngestError, Signal};

/// Primary ingestion API, called by sensor adapters.
///
/// Push-style: sensors call `ingest` as observations occur; transport
/// (file, queue, socket) is the sensor adapter's concern.
pub trait SignalIngestApi: Send + Sync {
    /// Validate, deduplicate, and buffer one signal.
    fn ingest(&self, signal: Signal) -> Result<(), IngestError>;

    /// Deliver buffered signals to the correlation sink, preserving
    /// per-entity arrival order. Returns the number delivered.
    fn deliver_pending(&self) -> usize;

    /// Current ingestion counters.
    fn stats(&self) -> IngestStats;
}
