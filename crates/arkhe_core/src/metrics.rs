//! Tick metrics and logging setup for the simulation.

use crate::evolution::EvolutionReport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// How often `record_tick` emits an info-level summary.
const SUMMARY_INTERVAL: u64 = 100;

/// Counters shared between the simulation worker and anyone reporting on it.
pub struct Metrics {
    ticks: AtomicU64,
    failures: AtomicU64,
    overruns: AtomicU64,
    rejected_moves: AtomicU64,
    injections: AtomicU64,
    last_tick_micros: AtomicU64,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
            rejected_moves: AtomicU64::new(0),
            injections: AtomicU64::new(0),
            last_tick_micros: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a completed tick with its wall-clock duration.
    pub fn record_tick(&self, duration: Duration, report: &EvolutionReport) {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        self.rejected_moves
            .fetch_add(report.rejected as u64, Ordering::Relaxed);
        self.last_tick_micros
            .store(duration.as_micros() as u64, Ordering::Relaxed);

        if tick % SUMMARY_INTERVAL == 0 {
            tracing::info!(
                tick = tick,
                agents = report.evaluated,
                rejected = report.rejected,
                duration_us = duration.as_micros() as u64,
                "Simulation tick"
            );
        }
    }

    /// Records a tick that returned an error or panicked.
    pub fn record_failure(&self, tick: u64, reason: &str) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        tracing::error!(tick = tick, reason = reason, "Simulation tick failed");
    }

    /// Records a tick that took longer than its period.
    pub fn record_overrun(&self, tick: u64, overrun: Duration) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            tick = tick,
            overrun_ms = overrun.as_millis() as u64,
            "Tick overran its period"
        );
    }

    pub fn record_injections(&self, count: usize) {
        self.injections.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn overrun_count(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn rejected_moves(&self) -> u64 {
        self.rejected_moves.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn injection_count(&self) -> u64 {
        self.injections.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn last_tick_duration(&self) -> Duration {
        Duration::from_micros(self.last_tick_micros.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
/// A second call is a no-op.
pub fn init_logging(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish(),
    )
    .ok();
}
