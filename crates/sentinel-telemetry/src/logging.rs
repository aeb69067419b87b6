//! Tracing subscriber setup.

use crate::TelemetryError;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// The filter comes from `SM_LOG_LEVEL` (falling back to `default_level`),
/// so operators can raise verbosity per target:
/// `SM_LOG_LEVEL=info,sm_02_correlator=debug`.
pub fn init_logging(default_level: &str) -> Result<(), TelemetryError> {
    let level = std::env::var("SM_LOG_LEVEL").unwrap_or_else(|_| default_level.to_string());
    let filter =
        EnvFilter::try_new(&level).map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
