//! # Response Orchestrator Service
//!
//! Implements [`DispatchApi`]: a bounded queue feeding a worker task that
//! applies actions through registered handlers with bounded retries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{OutcomeLedger, ResponseConfig, ResponseStats};
use crate::ports::inbound::DispatchApi;
use crate::ports::outbound::{ActionHandler, ResponseEventSink};
use shared_types::{ActionDiscriminant, DispatchError, Outcome, ResponseAction};

/// Response Orchestrator.
///
/// Dependencies:
/// - registered `ActionHandler`s, one per action variant
/// - `E: ResponseEventSink` - pipeline event notifications
pub struct ResponseOrchestrator<E>
where
    E: ResponseEventSink,
{
    config: ResponseConfig,
    handlers: HashMap<ActionDiscriminant, Arc<dyn ActionHandler>>,
    sender: mpsc::Sender<ResponseAction>,
    /// Taken once by the worker task.
    receiver: Mutex<Option<mpsc::Receiver<ResponseAction>>>,
    ledger: OutcomeLedger,
    events: Arc<E>,
    queue_depth: AtomicUsize,
    dispatched: AtomicU64,
    failed: AtomicU64,
}

impl<E> ResponseOrchestrator<E>
where
    E: ResponseEventSink,
{
    pub fn new(
        config: ResponseConfig,
        handlers: HashMap<ActionDiscriminant, Arc<dyn ActionHandler>>,
        events: Arc<E>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        Self {
            ledger: OutcomeLedger::new(config.outcome_retention),
            config,
            handlers,
            sender,
            receiver: Mutex::new(Some(receiver)),
            events,
            queue_depth: AtomicUsize::new(0),
            dispatched: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Run the dispatch worker until the queue closes.
    ///
    /// Spawned once by the runtime; a second call returns immediately.
    pub async fn run(self: Arc<Self>) {
        let Some(mut receiver) = self.receiver.lock().take() else {
            warn!("Dispatch worker already running");
            return;
        };
        info!("Response dispatch worker started");

        while let Some(action) = receiver.recv().await {
            self.queue_depth.fetch_sub(1, Ordering::Relaxed);
            let outcome = self.apply_with_retries(&action).await;

            if matches!(outcome, Outcome::Failed(_)) {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            self.dispatched.fetch_add(1, Ordering::Relaxed);
            self.ledger.record(action.id, outcome.clone());
            self.events
                .dispatch_completed(action.id, action.incident_id, &outcome);
        }
        info!("Response dispatch worker stopped");
    }

    /// Apply one action: retries on transient failures with exponential
    /// backoff, then a terminal `Failed`.
    async fn apply_with_retries(&self, action: &ResponseAction) -> Outcome {
        // Idempotency: an already-applied action is not re-applied.
        if let Some(outcome) = self.ledger.applied_outcome(action.id) {
            debug!(action = %action.id, "Already applied, returning recorded outcome");
            return outcome;
        }

        let variant = action.kind.discriminant();
        let Some(handler) = self.handlers.get(&variant) else {
            warn!(action = %action.id, %variant, "No handler registered");
            return Outcome::Failed(DispatchError::NoHandler(variant.to_string()).to_string());
        };

        let mut attempt = 1u32;
        loop {
            match handler.apply(action, action.id).await {
                Ok(outcome) => {
                    debug!(action = %action.id, attempt, ?outcome, "Handler applied");
                    return outcome;
                }
                Err(DispatchError::Transient(reason)) if attempt < self.config.retry.max_attempts => {
                    let delay = self.config.retry.delay_before_retry(attempt);
                    warn!(
                        action = %action.id,
                        attempt,
                        reason,
                        delay_ms = delay.as_millis() as u64,
                        "Transient dispatch failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(action = %action.id, attempt, error = %e, "Dispatch failed terminally");
                    return Outcome::Failed(e.to_string());
                }
            }
        }
    }
}

impl<E> DispatchApi for ResponseOrchestrator<E>
where
    E: ResponseEventSink,
{
    fn try_enqueue(&self, action: ResponseAction) -> Result<(), DispatchError> {
        match self.sender.try_send(action) {
            Ok(()) => {
                self.queue_depth.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                let depth = self.queue_depth.load(Ordering::Relaxed);
                self.events.queue_saturated(depth);
                Err(DispatchError::QueueSaturated)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(DispatchError::Permanent("dispatch queue closed".to_string()))
            }
        }
    }

    fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    fn stats(&self) -> ResponseStats {
        ResponseStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
        }
    }
}
