//! Ingestion-boundary validation.

use super::SignalBusConfig;
use shared_types::{IngestError, Signal};

/// Validate a signal at the ingestion boundary.
///
/// Rejections here are `MalformedSignal`: the signal never enters
/// correlation and is only counted.
pub fn validate_signal(
    signal: &Signal,
    config: &SignalBusConfig,
    now_ms: u64,
) -> Result<(), IngestError> {
    if signal.source_entity.as_str().trim().is_empty() {
        return Err(IngestError::MalformedSignal(
            "missing source entity".to_string(),
        ));
    }

    // NaN fails both comparisons' complement, so check explicitly.
    if !signal.confidence.is_finite() || !(0.0..=1.0).contains(&signal.confidence) {
        return Err(IngestError::MalformedSignal(format!(
            "confidence {} outside [0, 1]",
            signal.confidence
        )));
    }

    if signal.timestamp_ms > now_ms.saturating_add(config.max_future_skew_ms) {
        return Err(IngestError::MalformedSignal(format!(
            "timestamp {} ms beyond tolerated future skew",
            signal.timestamp_ms
        )));
    }

    Ok(())
}
