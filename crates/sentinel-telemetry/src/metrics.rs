//! Prometheus metrics for Sentinel-Mesh subsystems.
//!
//! All metrics follow the naming convention: `sm_<subsystem>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., signals_ingested_total)
//! - **Gauge**: Value that can go up or down (e.g., incidents_open)

use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SIGNAL BUS METRICS (Subsystem 1)
    // =========================================================================

    /// Total signals accepted at ingestion
    pub static ref SIGNALS_INGESTED: Counter = Counter::new(
        "sm_signal_bus_signals_ingested_total",
        "Total signals accepted at ingestion"
    ).expect("metric creation failed");

    /// Total signals rejected (malformed or duplicate)
    pub static ref SIGNALS_REJECTED: Counter = Counter::new(
        "sm_signal_bus_signals_rejected_total",
        "Total signals rejected at the ingestion boundary"
    ).expect("metric creation failed");

    /// Total signals dropped by backpressure
    pub static ref SIGNALS_DROPPED: Counter = Counter::new(
        "sm_signal_bus_signals_dropped_total",
        "Total signals dropped under backpressure (oldest-first per entity)"
    ).expect("metric creation failed");

    // =========================================================================
    // CORRELATOR METRICS (Subsystem 2)
    // =========================================================================

    /// Total incidents opened
    pub static ref INCIDENTS_OPENED: Counter = Counter::new(
        "sm_correlator_incidents_opened_total",
        "Total incidents opened"
    ).expect("metric creation failed");

    /// Total incident merges
    pub static ref INCIDENTS_MERGED: Counter = Counter::new(
        "sm_correlator_incidents_merged_total",
        "Total incident merges (lower id survived)"
    ).expect("metric creation failed");

    /// Total incidents closed
    pub static ref INCIDENTS_CLOSED: Counter = Counter::new(
        "sm_correlator_incidents_closed_total",
        "Total incidents closed"
    ).expect("metric creation failed");

    /// Currently open incidents
    pub static ref INCIDENTS_OPEN: Gauge = Gauge::new(
        "sm_correlator_incidents_open",
        "Number of currently open incidents"
    ).expect("metric creation failed");

    // =========================================================================
    // SCORER METRICS (Subsystem 3)
    // =========================================================================

    /// Total severity scores computed
    pub static ref SCORES_COMPUTED: Counter = Counter::new(
        "sm_scorer_scores_computed_total",
        "Total severity scores computed"
    ).expect("metric creation failed");

    /// Total scoring capability faults
    pub static ref SCORING_FAULTS: Counter = Counter::new(
        "sm_scorer_faults_total",
        "Total scoring capability faults (scored 0, pipeline continued)"
    ).expect("metric creation failed");

    // =========================================================================
    // POLICY METRICS (Subsystem 4)
    // =========================================================================

    /// Total response actions decided
    pub static ref ACTIONS_DECIDED: Counter = Counter::new(
        "sm_policy_actions_decided_total",
        "Total response actions decided"
    ).expect("metric creation failed");

    /// Current resource budget
    pub static ref RESOURCE_BUDGET: Gauge = Gauge::new(
        "sm_policy_resource_budget",
        "Current resource budget available for response actions"
    ).expect("metric creation failed");

    // =========================================================================
    // RESPONSE METRICS (Subsystem 5)
    // =========================================================================

    /// Total actions dispatched to handlers
    pub static ref ACTIONS_DISPATCHED: Counter = Counter::new(
        "sm_response_actions_dispatched_total",
        "Total actions dispatched to handlers"
    ).expect("metric creation failed");

    /// Total terminal dispatch failures
    pub static ref DISPATCH_FAILURES: Counter = Counter::new(
        "sm_response_dispatch_failures_total",
        "Total terminal dispatch failures after bounded retries"
    ).expect("metric creation failed");

    /// Current dispatch queue depth
    pub static ref DISPATCH_QUEUE_DEPTH: Gauge = Gauge::new(
        "sm_response_dispatch_queue_depth",
        "Number of actions waiting in the dispatch queue"
    ).expect("metric creation failed");

    // =========================================================================
    // FEDERATION METRICS (Subsystem 6)
    // =========================================================================

    /// Total federation messages sent
    pub static ref FEDERATION_MESSAGES_SENT: Counter = Counter::new(
        "sm_federation_messages_sent_total",
        "Total federation messages sent (broadcasts and forwards)"
    ).expect("metric creation failed");

    /// Total federation messages received and verified
    pub static ref FEDERATION_MESSAGES_RECEIVED: Counter = Counter::new(
        "sm_federation_messages_received_total",
        "Total federation messages received and verified"
    ).expect("metric creation failed");

    /// Total federation messages rejected
    pub static ref FEDERATION_MESSAGES_REJECTED: Counter = Counter::new(
        "sm_federation_messages_rejected_total",
        "Total federation messages discarded on verification failure"
    ).expect("metric creation failed");
}

/// Handle that keeps metrics registered. Currently just a marker; exists so
/// registration failures surface at startup rather than at first scrape.
pub struct MetricsHandle {
    _private: (),
}

/// Register all metrics with the global registry.
///
/// Safe to call once per process; repeated registration of the same metric
/// is reported as an init error.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SIGNALS_INGESTED.clone()),
        Box::new(SIGNALS_REJECTED.clone()),
        Box::new(SIGNALS_DROPPED.clone()),
        Box::new(INCIDENTS_OPENED.clone()),
        Box::new(INCIDENTS_MERGED.clone()),
        Box::new(INCIDENTS_CLOSED.clone()),
        Box::new(INCIDENTS_OPEN.clone()),
        Box::new(SCORES_COMPUTED.clone()),
        Box::new(SCORING_FAULTS.clone()),
        Box::new(ACTIONS_DECIDED.clone()),
        Box::new(RESOURCE_BUDGET.clone()),
        Box::new(ACTIONS_DISPATCHED.clone()),
        Box::new(DISPATCH_FAILURES.clone()),
        Box::new(DISPATCH_QUEUE_DEPTH.clone()),
        Box::new(FEDERATION_MESSAGES_SENT.clone()),
        Box::new(FEDERATION_MESSAGES_RECEIVED.clone()),
        Box::new(FEDERATION_MESSAGES_REJECTED.clone()),
    ];

    for collector in collectors {
        REGISTRY
            .register(collector)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle { _private: () })
}

/// Encode the current metric values in Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
