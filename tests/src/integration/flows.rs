//! # Pipeline Integration Flows
//!
//! Tests that the Signal Bus, Correlator, Scorer, Policy Engine, and
//! Response Orchestrator work together correctly through the shared bus:
//!
//! 1. **Signal → Dispatch**: accepted signals form an incident, get
//!    scored, and produce a dispatched response.
//! 2. **Terminal actions**: an Isolate decision closes the incident, and
//!    closed incidents freeze.
//! 3. **Budget exhaustion**: once the budget is drained, only Alert goes
//!    out until replenishment.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    use node_runtime::container::{NodeConfig, SubsystemContainer};
    use node_runtime::NodeRuntime;
    use shared_bus::{DefenseEvent, EventFilter, EventTopic, Subscription};
    use shared_types::{
        ActionKind, EntityId, Outcome, SignalId, Signal, SignalKind,
    };
    use sm_01_signal_bus::SignalIngestApi;
    use sm_02_correlator::CorrelatorApi;
    use sm_04_policy_engine::PolicyApi;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn exfil_signal(entity: &str, ts: u64, confidence: f64) -> Signal {
        Signal {
            id: SignalId::generate(),
            source_entity: EntityId::new(entity),
            kind: SignalKind::ExfilPattern,
            timestamp_ms: ts,
            attributes: BTreeMap::new(),
            confidence,
        }
    }

    /// Config with a rule set forcing Isolate as the only response above
    /// 0.5 severity (exercises terminal closure).
    fn isolate_only_config(budget: u64) -> NodeConfig {
        let raw = format!(
            r#"
[policy]
budget_capacity = {budget}

[[policy.rules]]
id = 1
min_severity = 0.0
max_severity = 0.5
allowed_actions = ["no_action", "alert"]

[[policy.rules]]
id = 2
min_severity = 0.5
max_severity = 1.0
allowed_actions = ["isolate"]
"#
        );
        let mut config: NodeConfig = toml_from(&raw);
        config.signal_bus.pump_interval_ms = 10;
        // Keep the replenish tick out of the test window.
        config.policy.replenish_interval_ms = 600_000;
        config
    }

    fn toml_from(raw: &str) -> NodeConfig {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(raw.as_bytes()).expect("write temp config");
        NodeConfig::load(Some(file.path())).expect("config")
    }

    async fn started_runtime(config: NodeConfig) -> NodeRuntime {
        let container = SubsystemContainer::new(config).expect("container");
        let runtime = NodeRuntime::new(container);
        runtime.start().await.expect("start");
        runtime
    }

    /// Wait for the next event matching a predicate.
    async fn wait_for_event<F>(sub: &mut Subscription, mut predicate: F) -> DefenseEvent
    where
        F: FnMut(&DefenseEvent) -> bool,
    {
        timeout(Duration::from_secs(10), async {
            loop {
                let event = sub.recv().await.expect("bus closed");
                if predicate(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("event did not arrive in time")
    }

    // =============================================================================
    // INTEGRATION TESTS: SIGNAL → DISPATCH
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_signal_to_dispatch_flow() {
        let mut config = NodeConfig::default();
        config.signal_bus.pump_interval_ms = 10;
        let runtime = started_runtime(config).await;
        let container = runtime.container();

        let mut sub = container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Response]));

        for i in 0..3u64 {
            container
                .signal_bus
                .ingest(exfil_signal("10.0.0.66", 1_000 * i, 0.95))
                .expect("ingest");
        }

        let event = wait_for_event(&mut sub, |e| {
            matches!(e, DefenseEvent::DispatchCompleted { .. })
        })
        .await;

        let DefenseEvent::DispatchCompleted { outcome, .. } = event else {
            unreachable!()
        };
        assert_eq!(outcome, Outcome::Success);

        // Every accepted signal landed in exactly one incident.
        let stats = container.correlator.stats();
        assert_eq!(stats.open_incidents + stats.closed_incidents as usize, 1);
        assert_eq!(container.signal_bus.stats().accepted, 3);

        runtime.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_action_carries_justification() {
        let mut config = NodeConfig::default();
        config.signal_bus.pump_interval_ms = 10;
        let runtime = started_runtime(config).await;
        let container = runtime.container();

        let mut sub = container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Policy]));

        for i in 0..3u64 {
            container
                .signal_bus
                .ingest(exfil_signal("10.0.0.9", 500 * i, 0.9))
                .expect("ingest");
        }

        let event = wait_for_event(&mut sub, |e| {
            matches!(
                e,
                DefenseEvent::ActionDecided(action) if !matches!(action.kind, ActionKind::NoAction)
            )
        })
        .await;

        let DefenseEvent::ActionDecided(action) = event else {
            unreachable!()
        };
        // Every action references exactly one score that existed at
        // decision time.
        assert!(action.justification.score_value > 0.0);
        assert!(action.justification.score_computed_at_ms > 0);

        runtime.shutdown().await;
    }

    // =============================================================================
    // INTEGRATION TESTS: TERMINAL ACTIONS
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_terminal_isolate_closes_incident() {
        let runtime = started_runtime(isolate_only_config(100)).await;
        let container = runtime.container();

        let mut sub = container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Correlation]));

        for i in 0..3u64 {
            container
                .signal_bus
                .ingest(exfil_signal("10.0.0.200", 100 * i, 0.95))
                .expect("ingest");
        }

        let event = wait_for_event(&mut sub, |e| {
            matches!(e, DefenseEvent::IncidentClosed { .. })
        })
        .await;

        let DefenseEvent::IncidentClosed { view } = event else {
            unreachable!()
        };
        assert!(!view.incident.is_open());

        // The frozen incident stays frozen: a later signal for the same
        // entity opens a new incident instead of mutating the closed one.
        let closed_members = view.incident.member_signal_ids.len();
        container
            .signal_bus
            .ingest(exfil_signal("10.0.0.200", 10_000, 0.95))
            .expect("ingest");

        wait_for_event(&mut sub, |e| {
            matches!(
                e,
                DefenseEvent::IncidentOpened { incident_id, .. } if *incident_id != view.id()
            )
        })
        .await;

        let frozen = container
            .correlator
            .view(view.id())
            .expect("closed incident retained");
        assert_eq!(frozen.incident.member_signal_ids.len(), closed_members);

        runtime.shutdown().await;
    }

    // =============================================================================
    // INTEGRATION TESTS: RESOURCE BUDGET
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_budget_exhaustion_prefers_alert() {
        // Budget covers exactly one Isolate (base cost 6).
        let runtime = started_runtime(isolate_only_config(6)).await;
        let container = runtime.container();

        let mut policy_sub = container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Policy]));

        // First incident: Isolate fits the budget.
        for i in 0..3u64 {
            container
                .signal_bus
                .ingest(exfil_signal("10.0.1.1", 100 * i, 0.95))
                .expect("ingest");
        }
        let first = wait_for_event(&mut policy_sub, |e| {
            matches!(
                e,
                DefenseEvent::ActionDecided(a) if matches!(a.kind, ActionKind::Isolate { .. })
            )
        })
        .await;
        let DefenseEvent::ActionDecided(first_action) = first else {
            unreachable!()
        };
        assert!(matches!(first_action.kind, ActionKind::Isolate { .. }));
        assert_eq!(container.policy.stats().budget_available, 0);

        // Second incident: the budget is gone, Alert is the ceiling.
        for i in 0..3u64 {
            container
                .signal_bus
                .ingest(exfil_signal("10.0.2.2", 100 * i, 0.95))
                .expect("ingest");
        }
        let second = wait_for_event(&mut policy_sub, |e| match e {
            DefenseEvent::ActionDecided(a) => {
                a.incident_id != first_action.incident_id
                    && !matches!(a.kind, ActionKind::NoAction)
            }
            _ => false,
        })
        .await;
        let DefenseEvent::ActionDecided(second_action) = second else {
            unreachable!()
        };
        assert!(matches!(second_action.kind, ActionKind::Alert));

        runtime.shutdown().await;
    }

    // =============================================================================
    // INTEGRATION TESTS: BACKPRESSURE VISIBILITY
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_burst_drops_are_counted_not_silent() {
        let mut config = NodeConfig::default();
        config.signal_bus.max_buffer_per_entity = 4;
        // Slow pump so the burst overflows the per-entity buffer.
        config.signal_bus.pump_interval_ms = 5_000;
        let container = Arc::new(SubsystemContainer::new(config).expect("container"));

        let mut sub = container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::SignalBus]));

        for i in 0..10u64 {
            container
                .signal_bus
                .ingest(exfil_signal("10.9.9.9", i, 0.9))
                .expect("ingest");
        }

        let stats = container.signal_bus.stats();
        assert_eq!(stats.accepted, 10);
        assert_eq!(stats.dropped, 6);
        assert_eq!(stats.buffered, 4);

        // Drop events carried the running counter.
        let mut drop_events = 0u64;
        while let Ok(Some(event)) = sub.try_recv() {
            if let DefenseEvent::SignalDropped { total_dropped, .. } = event {
                drop_events += 1;
                assert!(total_dropped >= drop_events);
            }
        }
        assert_eq!(drop_events, 6);
    }
}
