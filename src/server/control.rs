//! Transport-independent control-plane operations.
//!
//! Everything here reads the coordinator's latest snapshot or queues an
//! injection, so each call costs a pointer clone or a queue push and never
//! waits on a tick.

use crate::app::coordinator::SharedFieldCoordinator;
use crate::model::snapshot::FieldSnapshot;
use arkhe_data::{AgentInfo, CellReading, EngineStats, InjectOutcome, InjectRequest, SystemStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const NOT_LOADED: &str = "Simulation engine not loaded";

#[derive(Clone)]
pub struct ControlPlane {
    coordinator: Option<Arc<SharedFieldCoordinator>>,
    startup_error: Option<String>,
}

/// Counters exposed on `/api/metrics`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetricsReport {
    pub ticks: u64,
    pub failures: u64,
    pub overruns: u64,
    pub rejected_moves: u64,
    pub injections: u64,
    pub last_tick_ms: f64,
    pub published: u64,
    pub pending_injections: usize,
}

impl ControlPlane {
    pub fn new(coordinator: Arc<SharedFieldCoordinator>) -> Self {
        Self {
            coordinator: Some(coordinator),
            startup_error: None,
        }
    }

    /// A control plane with no simulation behind it.
    pub fn degraded<S: Into<String>>(reason: S) -> Self {
        Self {
            coordinator: None,
            startup_error: Some(reason.into()),
        }
    }

    pub fn coordinator(&self) -> Option<&Arc<SharedFieldCoordinator>> {
        self.coordinator.as_ref()
    }

    /// Why the simulation is unavailable, if it is.
    pub fn unavailable_reason(&self) -> Option<String> {
        match &self.coordinator {
            Some(_) => None,
            None => Some(match &self.startup_error {
                Some(e) => format!("{NOT_LOADED}: {e}"),
                None => NOT_LOADED.to_string(),
            }),
        }
    }

    pub fn get_system_status(&self) -> SystemStatus {
        match &self.coordinator {
            Some(coordinator) => {
                let snapshot = coordinator.current_snapshot();
                SystemStatus::operational(
                    &snapshot.stats,
                    snapshot.tick,
                    coordinator.has_published(),
                )
            }
            None => SystemStatus::error(self.unavailable_reason().unwrap_or_default()),
        }
    }

    pub fn inject_field_signal(&self, request: InjectRequest) -> InjectOutcome {
        match &self.coordinator {
            Some(coordinator) => {
                coordinator.inject(request.x, request.y, request.z, request.strength)
            }
            None => InjectOutcome::Unavailable {
                reason: self.unavailable_reason().unwrap_or_default(),
            },
        }
    }

    pub fn snapshot(&self) -> Option<Arc<FieldSnapshot>> {
        self.coordinator.as_ref().map(|c| c.current_snapshot())
    }

    pub fn stats(&self) -> Option<EngineStats> {
        self.snapshot().map(|s| s.stats.clone())
    }

    /// Outer `None`: no simulation. Inner `None`: no such agent.
    pub fn agent_info(&self, id: u32) -> Option<Option<AgentInfo>> {
        self.snapshot().map(|s| s.agent(id).cloned())
    }

    pub fn cell(&self, x: f64, y: f64, z: f64) -> Option<CellReading> {
        self.snapshot().map(|s| s.cell(x, y, z))
    }

    pub fn metrics(&self) -> Option<MetricsReport> {
        let coordinator = self.coordinator.as_ref()?;
        let metrics = coordinator.metrics();
        Some(MetricsReport {
            ticks: metrics.tick_count(),
            failures: metrics.failure_count(),
            overruns: metrics.overrun_count(),
            rejected_moves: metrics.rejected_moves(),
            injections: metrics.injection_count(),
            last_tick_ms: metrics.last_tick_duration().as_secs_f64() * 1000.0,
            published: coordinator.published_count(),
            pending_injections: coordinator.pending_count(),
        })
    }
}
