//! Shared field coordinator: the only state the simulation worker and the
//! control plane have in common.
//!
//! - Snapshots are published by swapping an `Arc` under a lock held for a
//!   pointer write, so readers never wait on a tick and never copy the grid.
//! - Injections are validated here and queued; the worker applies the queue
//!   at the start of its next tick. An injection accepted while tick `k` runs
//!   is therefore first visible in the snapshot of tick `k + 1`.
//! - The queue is bounded so the work a tick does applying it is bounded too;
//!   a full queue rejects new injections until the worker drains it.

use crate::model::engine::SimulationEngine;
use crate::model::field::cell_of;
use crate::model::metrics::Metrics;
use crate::model::snapshot::FieldSnapshot;
use arkhe_data::{InjectOutcome, InjectRequest};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;

/// Injections held between two ticks when no limit is configured.
pub const DEFAULT_QUEUE_LIMIT: usize = 1024;

pub struct SharedFieldCoordinator {
    latest: RwLock<Arc<FieldSnapshot>>,
    published: AtomicU64,
    pending: Mutex<Vec<InjectRequest>>,
    queue_limit: usize,
    accepting: AtomicBool,
    extent: usize,
    telemetry: broadcast::Sender<Arc<FieldSnapshot>>,
    metrics: Metrics,
}

impl SharedFieldCoordinator {
    /// Seeds the coordinator with the engine's initial state. The seed does not
    /// count as a publish, so `has_published` stays false until the first tick.
    pub fn new(initial: FieldSnapshot, telemetry_capacity: usize) -> Self {
        let (telemetry, _rx) = broadcast::channel(telemetry_capacity.max(1));
        Self {
            extent: initial.grid.extent,
            latest: RwLock::new(Arc::new(initial)),
            published: AtomicU64::new(0),
            pending: Mutex::new(Vec::new()),
            queue_limit: DEFAULT_QUEUE_LIMIT,
            accepting: AtomicBool::new(true),
            telemetry,
            metrics: Metrics::new(),
        }
    }

    pub fn for_engine(engine: &SimulationEngine, telemetry_capacity: usize) -> Self {
        Self::new(engine.snapshot(), telemetry_capacity)
    }

    /// Caps how many injections may wait for the next tick (minimum 1).
    #[must_use]
    pub fn with_queue_limit(mut self, limit: usize) -> Self {
        self.queue_limit = limit.max(1);
        self
    }

    /// Makes `snapshot` the one every subsequent reader sees.
    pub fn publish(&self, snapshot: FieldSnapshot) {
        let snapshot = Arc::new(snapshot);
        {
            let mut latest = self.latest.write().unwrap_or_else(|e| e.into_inner());
            *latest = Arc::clone(&snapshot);
        }
        self.published.fetch_add(1, Ordering::Release);
        // No subscribers is not an error.
        let _ = self.telemetry.send(snapshot);
    }

    pub fn current_snapshot(&self) -> Arc<FieldSnapshot> {
        let latest = self.latest.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&latest)
    }

    pub fn has_published(&self) -> bool {
        self.published_count() > 0
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }

    /// Validates and queues an injection for the next tick.
    pub fn inject(&self, x: f64, y: f64, z: f64, strength: f64) -> InjectOutcome {
        if !self.is_accepting() {
            return InjectOutcome::Rejected {
                reason: "simulation is shutting down".to_string(),
            };
        }
        if !(strength as f32).is_finite() {
            return InjectOutcome::Ignored {
                reason: format!("strength {strength} is not a finite f32"),
            };
        }
        let Some(cell) = cell_of(self.extent, x, y, z) else {
            return InjectOutcome::Ignored {
                reason: format!(
                    "({x}, {y}, {z}) is outside the field [0, {})",
                    self.extent
                ),
            };
        };

        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            if pending.len() >= self.queue_limit {
                return InjectOutcome::Rejected {
                    reason: format!(
                        "injection queue full ({} pending), retry after the next tick",
                        self.queue_limit
                    ),
                };
            }
            pending.push(InjectRequest { x, y, z, strength });
        }

        InjectOutcome::Queued {
            cell,
            message: format!("Signal of strength {strength} injected at ({x}, {y}, {z})."),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Takes every queued injection, leaving the queue empty.
    pub fn drain_pending(&self) -> Vec<InjectRequest> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Writes all queued injections into the live field. Returns how many landed.
    pub fn apply_pending(&self, engine: &mut SimulationEngine) -> usize {
        let applied = self
            .drain_pending()
            .into_iter()
            .filter(|r| engine.inject_signal(r.x, r.y, r.z, r.strength))
            .count();
        if applied > 0 {
            self.metrics.record_injections(applied);
        }
        applied
    }

    /// Stops accepting injections. Already-queued ones still apply.
    pub fn begin_shutdown(&self) {
        if self.accepting.swap(false, Ordering::SeqCst) {
            tracing::info!("Coordinator no longer accepting injections");
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<FieldSnapshot>> {
        self.telemetry.subscribe()
    }

    pub fn queue_limit(&self) -> usize {
        self.queue_limit
    }

    pub fn extent(&self) -> usize {
        self.extent
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::AppConfig;

    fn engine(agents: usize) -> SimulationEngine {
        let mut config = AppConfig::default();
        config.simulation.agent_count = agents;
        config.simulation.seed = Some(3);
        config.field.extent = 20;
        SimulationEngine::new(&config).unwrap()
    }

    #[test]
    fn test_initial_snapshot_is_not_published() {
        let engine = engine(5);
        let coordinator = SharedFieldCoordinator::for_engine(&engine, 4);
        assert!(!coordinator.has_published());
        assert_eq!(coordinator.current_snapshot().tick, 0);
        assert_eq!(coordinator.current_snapshot().stats.agent_count, 5);
    }

    #[test]
    fn test_publish_swaps_snapshot() {
        let mut engine = engine(5);
        let coordinator = SharedFieldCoordinator::for_engine(&engine, 4);
        let before = coordinator.current_snapshot();
        engine.tick(0.1).unwrap();
        coordinator.publish(engine.snapshot());
        assert!(coordinator.has_published());
        assert_eq!(coordinator.current_snapshot().tick, 1);
        // A reader holding the old snapshot keeps a consistent view.
        assert_eq!(before.tick, 0);
    }

    #[test]
    fn test_inject_queues_until_applied() {
        let mut engine = engine(0);
        let coordinator = SharedFieldCoordinator::for_engine(&engine, 4);
        let outcome = coordinator.inject(1.5, 2.5, 3.5, 2.0);
        assert_eq!(
            outcome,
            InjectOutcome::Queued {
                cell: [1, 2, 3],
                message: "Signal of strength 2 injected at (1.5, 2.5, 3.5).".to_string(),
            }
        );
        assert_eq!(engine.field().get(1, 2, 3), Some(0.0));
        assert_eq!(coordinator.apply_pending(&mut engine), 1);
        assert_eq!(engine.field().get(1, 2, 3), Some(2.0));
        assert_eq!(coordinator.pending_count(), 0);
        assert_eq!(coordinator.metrics().injection_count(), 1);
    }

    #[test]
    fn test_out_of_bounds_and_non_finite_are_ignored() {
        let engine = engine(0);
        let coordinator = SharedFieldCoordinator::for_engine(&engine, 4);
        for outcome in [
            coordinator.inject(20.0, 1.0, 1.0, 1.0),
            coordinator.inject(-0.1, 1.0, 1.0, 1.0),
            coordinator.inject(1.0, f64::NAN, 1.0, 1.0),
            coordinator.inject(1.0, 1.0, 1.0, f64::INFINITY),
        ] {
            assert!(matches!(outcome, InjectOutcome::Ignored { .. }));
        }
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn test_oversized_strength_never_poisons_the_field() {
        let mut engine = engine(0);
        let coordinator = SharedFieldCoordinator::for_engine(&engine, 4);
        for strength in [1e39, -1e39, f64::MAX] {
            assert!(matches!(
                coordinator.inject(1.0, 1.0, 1.0, strength),
                InjectOutcome::Ignored { .. }
            ));
        }
        // Each fits in f32 but together they would overflow the cell.
        assert!(coordinator.inject(1.0, 1.0, 1.0, 3.0e38).is_queued());
        assert!(coordinator.inject(1.0, 1.0, 1.0, 3.0e38).is_queued());
        assert_eq!(coordinator.apply_pending(&mut engine), 1);

        engine.tick(0.1).unwrap();
        coordinator.publish(engine.snapshot());
        let reading = coordinator.current_snapshot().cell(1.0, 1.0, 1.0);
        assert_eq!(reading.value, Some(3.0e38));
        let json = serde_json::to_value(&reading).unwrap();
        assert!(!json["value"].is_null());
    }

    #[test]
    fn test_full_queue_rejects_until_drained() {
        let mut engine = engine(0);
        let coordinator = SharedFieldCoordinator::for_engine(&engine, 4).with_queue_limit(2);
        assert!(coordinator.inject(1.0, 1.0, 1.0, 1.0).is_queued());
        assert!(coordinator.inject(2.0, 2.0, 2.0, 1.0).is_queued());
        assert!(matches!(
            coordinator.inject(3.0, 3.0, 3.0, 1.0),
            InjectOutcome::Rejected { .. }
        ));
        assert_eq!(coordinator.pending_count(), 2);

        assert_eq!(coordinator.apply_pending(&mut engine), 2);
        assert!(coordinator.inject(3.0, 3.0, 3.0, 1.0).is_queued());
    }

    #[test]
    fn test_shutdown_rejects_new_injections() {
        let engine = engine(0);
        let coordinator = SharedFieldCoordinator::for_engine(&engine, 4);
        coordinator.begin_shutdown();
        assert!(matches!(
            coordinator.inject(1.0, 1.0, 1.0, 1.0),
            InjectOutcome::Rejected { .. }
        ));
    }

    #[test]
    fn test_publish_reaches_subscribers() {
        let mut engine = engine(2);
        let coordinator = SharedFieldCoordinator::for_engine(&engine, 4);
        let mut rx = coordinator.subscribe();
        engine.tick(0.1).unwrap();
        coordinator.publish(engine.snapshot());
        assert_eq!(rx.try_recv().unwrap().tick, 1);
    }
}
