//! # Sentinel-Mesh Node Runtime
//!
//! The runtime for one autonomous defense node.
//!
//! ## Architecture
//!
//! Subsystems communicate through the shared event bus (choreography, not
//! orchestration); this crate wires their adapters, runs the event
//! handlers, and owns the maintenance timers and process lifecycle.
//!
//! ## Pipeline
//!
//! ```text
//! [Sensors] → SignalBus(1) → Correlator(2) → Scorer(3) → Policy(4) → Response(5)
//!                                 ↑                                      │
//!                          Federation(6) ←──── closed-incident digests ──┘
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (TOML file + `SM_*` env overrides)
//! 2. Wire subsystems in dependency order ([`SubsystemContainer`])
//! 3. Spawn the dispatch worker and choreography handlers
//! 4. Start maintenance timers (pump, sweep, replenish, posture, gossip)
//! 5. Signal ready

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use shared_bus::{EventFilter, EventTopic};
use tracing::{error, info};

use crate::container::SubsystemContainer;
use crate::handlers::{FederationHandler, PolicyHandler, ScoringHandler};
use crate::status::NodeStatus;
use sm_01_signal_bus::SignalIngestApi;
use sm_02_correlator::CorrelatorApi;
use sm_04_policy_engine::PolicyApi;
use sm_06_federation::FederationApi;

/// The main node runtime orchestrating all subsystems.
pub struct NodeRuntime {
    container: Arc<SubsystemContainer>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl NodeRuntime {
    /// Create a runtime from a wired container.
    pub fn new(container: SubsystemContainer) -> Self {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        Self {
            container: Arc::new(container),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Start the node: dispatch worker, handlers, timers.
    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Sentinel-Mesh Node Runtime v0.1.0");
        info!("  Node: {}", self.container.node_id);
        info!("===========================================");

        self.start_dispatch_worker();
        self.start_choreography_handlers();
        self.start_timers();

        info!("All subsystems running");
        Ok(())
    }

    fn start_dispatch_worker(&self) {
        let response = Arc::clone(&self.container.response);
        tokio::spawn(response.run());
    }

    fn start_choreography_handlers(&self) {
        let container = &self.container;

        // Scoring: reacts to incident updates and closures.
        let scoring_handler = ScoringHandler::new(
            container
                .bus
                .subscribe(EventFilter::topics(vec![EventTopic::Correlation])),
            Arc::clone(&container.scorer),
        );
        let mut scoring_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = scoring_handler.run() => {}
                _ = scoring_shutdown.changed() => {
                    info!("[sm-03] Shutdown signal received");
                }
            }
        });

        // Policy: reacts to scores, closures, and dispatch feedback.
        let policy_handler = PolicyHandler::new(
            container.bus.subscribe(EventFilter::topics(vec![
                EventTopic::Scoring,
                EventTopic::Correlation,
                EventTopic::Response,
            ])),
            Arc::clone(&container.policy),
            Arc::clone(&container.correlator),
        );
        let mut policy_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = policy_handler.run() => {}
                _ = policy_shutdown.changed() => {
                    info!("[sm-04] Shutdown signal received");
                }
            }
        });

        // Federation: buffers closed incidents for gossip.
        let federation_handler = FederationHandler::new(
            container.bus.subscribe(EventFilter::topics(vec![
                EventTopic::Scoring,
                EventTopic::Correlation,
            ])),
            Arc::clone(&container.federation),
            Arc::clone(&container.clock),
        );
        let mut federation_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = federation_handler.run() => {}
                _ = federation_shutdown.changed() => {
                    info!("[sm-06] Shutdown signal received");
                }
            }
        });

        info!("Choreography handlers started");
    }

    fn start_timers(&self) {
        let config = &self.container.config;

        // Delivery pump: Signal Bus buffers → Correlator.
        self.spawn_interval(
            Duration::from_millis(config.signal_bus.pump_interval_ms.max(1)),
            {
                let signal_bus = Arc::clone(&self.container.signal_bus);
                move || {
                    signal_bus.deliver_pending();
                }
            },
        );

        // Window sweep: close inactive incidents.
        self.spawn_interval(
            Duration::from_millis(config.correlator.sweep_interval_ms.max(1)),
            {
                let correlator = Arc::clone(&self.container.correlator);
                let clock = Arc::clone(&self.container.clock);
                move || {
                    correlator.sweep(clock.now_ms());
                }
            },
        );

        // Budget replenish.
        self.spawn_interval(
            Duration::from_millis(config.policy.replenish_interval_ms.max(1)),
            {
                let policy = Arc::clone(&self.container.policy);
                move || {
                    policy.replenish_budget();
                    sentinel_telemetry::RESOURCE_BUDGET.set(policy.stats().budget_available as f64);
                }
            },
        );

        // Posture review.
        self.spawn_interval(
            Duration::from_millis(config.policy.posture_review_interval_ms.max(1)),
            {
                let policy = Arc::clone(&self.container.policy);
                move || {
                    policy.review_posture();
                }
            },
        );

        // Gossip tick: broadcast buffered digests. Runs on its own timer;
        // a partitioned transport never blocks local processing.
        if config.federation.enabled {
            let federation = Arc::clone(&self.container.federation);
            let interval = Duration::from_millis(config.federation.gossip_interval_ms.max(1));
            let mut shutdown = self.shutdown_rx.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let reached = federation.broadcast_tick().await;
                            if reached > 0 {
                                sentinel_telemetry::FEDERATION_MESSAGES_SENT.inc_by(reached as f64);
                            }
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            });
        }

        info!("Maintenance timers started");
    }

    /// Spawn a shutdown-aware interval task around a synchronous tick.
    fn spawn_interval<F>(&self, period: Duration, mut tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => tick(),
                    _ = shutdown.changed() => break,
                }
            }
        });
    }

    /// Current status snapshot (operational surface).
    pub fn status(&self) -> NodeStatus {
        NodeStatus::collect(&self.container)
    }

    /// Get a reference to the subsystem container.
    pub fn container(&self) -> Arc<SubsystemContainer> {
        Arc::clone(&self.container)
    }

    /// Shutdown the node gracefully.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        // Give handlers time to drain.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let status = self.status();
        info!(
            open = status.open_incidents,
            closed = status.closed_incidents,
            dispatched = status.response.dispatched,
            "Shutdown complete"
        );
    }
}
