//! # Sentinel Telemetry
//!
//! Observability for Sentinel-Mesh nodes.
//!
//! ## Components
//!
//! - **Logging**: `tracing` with an env-filtered fmt subscriber
//! - **Metrics**: Prometheus counters/gauges per pipeline stage
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_telemetry::{init_logging, register_metrics};
//!
//! fn main() {
//!     init_logging("info").expect("logging init");
//!     let _metrics = register_metrics().expect("metrics init");
//!     // Pipeline counters are now live; scrape via encode_metrics()
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SM_LOG_LEVEL` | `info` | Log level filter |

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, ACTIONS_DECIDED, ACTIONS_DISPATCHED,
    DISPATCH_FAILURES, DISPATCH_QUEUE_DEPTH, FEDERATION_MESSAGES_RECEIVED,
    FEDERATION_MESSAGES_REJECTED, FEDERATION_MESSAGES_SENT, INCIDENTS_CLOSED, INCIDENTS_MERGED,
    INCIDENTS_OPEN, INCIDENTS_OPENED, RESOURCE_BUDGET, SCORES_COMPUTED, SCORING_FAULTS,
    SIGNALS_DROPPED, SIGNALS_INGESTED, SIGNALS_REJECTED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}
