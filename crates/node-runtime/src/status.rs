//! Node status query: the operational surface's snapshot of the pipeline.

use serde::Serialize;
use sm_01_signal_bus::{IngestStats, SignalIngestApi};
use sm_02_correlator::{CorrelatorApi, CorrelatorStats};
use sm_04_policy_engine::{PolicyApi, PolicyStats};
use sm_05_response::{DispatchApi, ResponseStats};
use sm_06_federation::{FederationApi, FederationStats};

use crate::container::SubsystemContainer;

/// Point-in-time snapshot of a node's health and pipeline counters.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub node_id: String,
    pub uptime_secs: u64,
    pub posture: String,
    pub open_incidents: usize,
    pub closed_incidents: u64,
    pub budget_available: u64,
    #[serde(serialize_with = "serialize_ingest")]
    pub ingest: IngestStats,
    #[serde(serialize_with = "serialize_correlator")]
    pub correlator: CorrelatorStats,
    #[serde(serialize_with = "serialize_policy")]
    pub policy: PolicyStats,
    #[serde(serialize_with = "serialize_response")]
    pub response: ResponseStats,
    #[serde(serialize_with = "serialize_federation")]
    pub federation: FederationStats,
}

impl NodeStatus {
    /// Gather the current snapshot from a wired container.
    pub fn collect(container: &SubsystemContainer) -> Self {
        let correlator = container.correlator.stats();
        let policy = container.policy.stats();
        Self {
            node_id: container.node_id.to_string(),
            uptime_secs: container.started_at.elapsed().as_secs(),
            posture: container.policy.posture().to_string(),
            open_incidents: correlator.open_incidents,
            closed_incidents: correlator.closed_incidents,
            budget_available: policy.budget_available,
            ingest: container.signal_bus.stats(),
            correlator,
            policy,
            response: container.response.stats(),
            federation: container.federation.stats(),
        }
    }
}

// The subsystem stat structs live in crates that do not depend on serde;
// flatten them into plain maps here instead of forcing the dependency.

fn serialize_ingest<S: serde::Serializer>(stats: &IngestStats, s: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = s.serialize_map(Some(4))?;
    map.serialize_entry("accepted", &stats.accepted)?;
    map.serialize_entry("rejected", &stats.rejected)?;
    map.serialize_entry("dropped", &stats.dropped)?;
    map.serialize_entry("buffered", &stats.buffered)?;
    map.end()
}

fn serialize_correlator<S: serde::Serializer>(
    stats: &CorrelatorStats,
    s: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = s.serialize_map(Some(3))?;
    map.serialize_entry("open_incidents", &stats.open_incidents)?;
    map.serialize_entry("closed_incidents", &stats.closed_incidents)?;
    map.serialize_entry("merges", &stats.merges)?;
    map.end()
}

fn serialize_policy<S: serde::Serializer>(stats: &PolicyStats, s: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = s.serialize_map(Some(3))?;
    map.serialize_entry("decisions", &stats.decisions)?;
    map.serialize_entry("forced_alerts", &stats.forced_alerts)?;
    map.serialize_entry("budget_available", &stats.budget_available)?;
    map.end()
}

fn serialize_response<S: serde::Serializer>(
    stats: &ResponseStats,
    s: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = s.serialize_map(Some(3))?;
    map.serialize_entry("dispatched", &stats.dispatched)?;
    map.serialize_entry("failed", &stats.failed)?;
    map.serialize_entry("queue_depth", &stats.queue_depth)?;
    map.end()
}

fn serialize_federation<S: serde::Serializer>(
    stats: &FederationStats,
    s: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = s.serialize_map(Some(4))?;
    map.serialize_entry("messages_sent", &stats.messages_sent)?;
    map.serialize_entry("messages_received", &stats.messages_received)?;
    map.serialize_entry("messages_rejected", &stats.messages_rejected)?;
    map.serialize_entry("known_peers", &stats.known_peers)?;
    map.end()
}
