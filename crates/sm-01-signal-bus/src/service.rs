//! # Signal Bus Service
//!
//! Implements [`SignalIngestApi`]: validation, deduplication, bounded
//! per-entity buffering with drop-oldest backpressure, and ordered delivery
//! to the correlation sink.
//!
//! ## Thread Safety
//!
//! The service is shared across sensor tasks via `Arc`; all internal state
//! is lock-protected with entity-scoped granularity in the buffers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{validate_signal, EntityBuffers, IngestStats, SeenSignalCache, SignalBusConfig};
use crate::ports::inbound::SignalIngestApi;
use crate::ports::outbound::{CorrelationSink, IngestEventSink, TimeSource};
use shared_types::{IngestError, Signal};

/// Signal Bus service.
///
/// Dependencies:
/// - `C: CorrelationSink` - where accepted signals go
/// - `E: IngestEventSink` - pipeline event notifications
/// - `T: TimeSource` - clock for timestamp validation
pub struct SignalBusService<C, E, T>
where
    C: CorrelationSink,
    E: IngestEventSink,
    T: TimeSource,
{
    config: SignalBusConfig,
    seen: SeenSignalCache,
    buffers: EntityBuffers,
    sink: Arc<C>,
    events: Arc<E>,
    time: Arc<T>,
    accepted: AtomicU64,
    rejected: AtomicU64,
    dropped: AtomicU64,
}

impl<C, E, T> SignalBusService<C, E, T>
where
    C: CorrelationSink,
    E: IngestEventSink,
    T: TimeSource,
{
    pub fn new(config: SignalBusConfig, sink: Arc<C>, events: Arc<E>, time: Arc<T>) -> Self {
        Self {
            seen: SeenSignalCache::new(config.seen_cache_size),
            buffers: EntityBuffers::new(config.max_buffer_per_entity),
            config,
            sink,
            events,
            time,
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }
}

impl<C, E, T> SignalIngestApi for SignalBusService<C, E, T>
where
    C: CorrelationSink,
    E: IngestEventSink,
    T: TimeSource,
{
    fn ingest(&self, signal: Signal) -> Result<(), IngestError> {
        if let Err(e) = validate_signal(&signal, &self.config, self.time.now_ms()) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            self.events.signal_rejected(Some(signal.id), &e.to_string());
            warn!(signal = %signal.id, error = %e, "Signal rejected");
            return Err(e);
        }

        if self.seen.has_seen(&signal.id) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            let err = IngestError::DuplicateSignal(signal.id);
            self.events.signal_rejected(Some(signal.id), &err.to_string());
            return Err(err);
        }
        self.seen.mark_seen(signal.id);

        if let Some(dropped) = self.buffers.push(signal.clone()) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.events.signal_dropped(
                &dropped.signal.source_entity,
                dropped.signal.id,
                dropped.total_dropped,
            );
            warn!(
                entity = %dropped.signal.source_entity,
                dropped = %dropped.signal.id,
                total = dropped.total_dropped,
                "Backpressure drop (oldest first)"
            );
        }

        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.events.signal_accepted(&signal);
        debug!(signal = %signal.id, entity = %signal.source_entity, "Signal accepted");
        Ok(())
    }

    fn deliver_pending(&self) -> usize {
        let drained = self.buffers.drain_all();
        let count = drained.len();
        for signal in drained {
            self.sink.deliver(signal);
        }
        count
    }

    fn stats(&self) -> IngestStats {
        IngestStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            buffered: self.buffers.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use shared_types::{EntityId, SignalId, SignalKind};
    use std::collections::BTreeMap;

    // ==========================================================================
    // MOCK IMPLEMENTATIONS FOR TESTING
    // ==========================================================================

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<Signal>>,
    }

    impl CorrelationSink for RecordingSink {
        fn deliver(&self, signal: Signal) {
            self.delivered.lock().push(signal);
        }
    }

    #[derive(Default)]
    struct RecordingEvents {
        accepted: Mutex<Vec<SignalId>>,
        rejected: Mutex<Vec<String>>,
        dropped: Mutex<Vec<(EntityId, SignalId, u64)>>,
    }

    impl IngestEventSink for RecordingEvents {
        fn signal_accepted(&self, signal: &Signal) {
            self.accepted.lock().push(signal.id);
        }

        fn signal_rejected(&self, _signal_id: Option<SignalId>, reason: &str) {
            self.rejected.lock().push(reason.to_string());
        }

        fn signal_dropped(&self, entity: &EntityId, dropped: SignalId, total: u64) {
            self.dropped.lock().push((entity.clone(), dropped, total));
        }
    }

    struct FixedTime(u64);

    impl TimeSource for FixedTime {
        fn now_ms(&self) -> u64 {
            self.0
        }
    }

    const NOW: u64 = 1_000_000;

    fn signal(entity: &str, ts: u64, confidence: f64) -> Signal {
        Signal {
            id: SignalId::generate(),
            source_entity: EntityId::new(entity),
            kind: SignalKind::PortScan,
            timestamp_ms: ts,
            attributes: BTreeMap::new(),
            confidence,
        }
    }

    type TestService = SignalBusService<RecordingSink, RecordingEvents, FixedTime>;

    fn create_service(config: SignalBusConfig) -> (Arc<TestService>, Arc<RecordingSink>, Arc<RecordingEvents>) {
        let sink = Arc::new(RecordingSink::default());
        let events = Arc::new(RecordingEvents::default());
        let service = Arc::new(SignalBusService::new(
            config,
            Arc::clone(&sink),
            Arc::clone(&events),
            Arc::new(FixedTime(NOW)),
        ));
        (service, sink, events)
    }

    #[test]
    fn test_ingest_and_deliver() {
        let (service, sink, events) = create_service(SignalBusConfig::default());

        let s = signal("10.0.0.1", NOW, 0.9);
        service.ingest(s.clone()).unwrap();

        assert_eq!(service.stats().buffered, 1);
        assert_eq!(events.accepted.lock().len(), 1);

        let delivered = service.deliver_pending();
        assert_eq!(delivered, 1);
        assert_eq!(sink.delivered.lock()[0].id, s.id);
        assert_eq!(service.stats().buffered, 0);
    }

    #[test]
    fn test_malformed_rejected_and_counted() {
        let (service, _sink, events) = create_service(SignalBusConfig::default());

        let result = service.ingest(signal("10.0.0.1", NOW, 1.5));
        assert!(matches!(result, Err(IngestError::MalformedSignal(_))));
        assert_eq!(service.stats().rejected, 1);
        assert_eq!(service.stats().accepted, 0);
        assert_eq!(events.rejected.lock().len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let (service, _sink, _events) = create_service(SignalBusConfig::default());

        let s = signal("10.0.0.1", NOW, 0.9);
        service.ingest(s.clone()).unwrap();
        let result = service.ingest(s.clone());

        assert_eq!(result, Err(IngestError::DuplicateSignal(s.id)));
        assert_eq!(service.stats().accepted, 1);
        assert_eq!(service.stats().rejected, 1);
    }

    #[test]
    fn test_backpressure_emits_drop_event() {
        let config = SignalBusConfig {
            max_buffer_per_entity: 2,
            ..Default::default()
        };
        let (service, _sink, events) = create_service(config);

        let oldest = signal("host-a", NOW, 0.9);
        service.ingest(oldest.clone()).unwrap();
        service.ingest(signal("host-a", NOW + 1, 0.9)).unwrap();
        service.ingest(signal("host-a", NOW + 2, 0.9)).unwrap();

        let drops = events.dropped.lock();
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].0, EntityId::new("host-a"));
        assert_eq!(drops[0].1, oldest.id);
        assert_eq!(drops[0].2, 1);
        assert_eq!(service.stats().dropped, 1);
        // The new signal still counts as accepted.
        assert_eq!(service.stats().accepted, 3);
    }

    #[test]
    fn test_per_entity_order_preserved() {
        let (service, sink, _events) = create_service(SignalBusConfig::default());

        let a1 = signal("host-a", NOW, 0.9);
        let a2 = signal("host-a", NOW + 1, 0.9);
        let b1 = signal("host-b", NOW, 0.9);

        service.ingest(a1.clone()).unwrap();
        service.ingest(b1).unwrap();
        service.ingest(a2.clone()).unwrap();

        service.deliver_pending();

        let delivered = sink.delivered.lock();
        let a_positions: Vec<usize> = delivered
            .iter()
            .enumerate()
            .filter(|(_, s)| s.source_entity == EntityId::new("host-a"))
            .map(|(i, _)| i)
            .collect();
        // a1 before a2 regardless of where host-b lands.
        assert_eq!(delivered[a_positions[0]].id, a1.id);
        assert_eq!(delivered[a_positions[1]].id, a2.id);
    }

    #[test]
    fn test_every_accepted_signal_is_delivered_or_counted_dropped() {
        let config = SignalBusConfig {
            max_buffer_per_entity: 4,
            ..Default::default()
        };
        let (service, sink, _events) = create_service(config);

        for i in 0..20 {
            service.ingest(signal("host-a", NOW + i, 0.9)).unwrap();
        }
        let delivered = service.deliver_pending();

        let stats = service.stats();
        assert_eq!(delivered as u64 + stats.dropped, stats.accepted);
        assert_eq!(sink.delivered.lock().len(), delivered);
    }
}
