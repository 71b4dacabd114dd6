//! Fixed-rate simulation worker.
//!
//! Runs on a dedicated OS thread. Each iteration applies queued injections,
//! advances the engine one tick and publishes the result. A failed tick is
//! rolled back and not published, so readers only ever see completed ticks.
//! A tick that overruns its period is followed immediately by the next one;
//! there is no catch-up, so sustained overload lowers the effective rate.

use crate::app::coordinator::SharedFieldCoordinator;
use crate::model::config::AppConfig;
use crate::model::engine::SimulationEngine;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerConfig {
    pub dt: f64,
    pub period: Duration,
}

impl From<&AppConfig> for WorkerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            dt: config.simulation.dt,
            period: config.tick_period(),
        }
    }
}

/// One full worker iteration: apply injections, tick, publish.
///
/// Errors and panics raised by the tick are logged and counted, the engine is
/// rolled back to the previous tick and the last published snapshot stays
/// current. Applied injections survive the rollback and show up with the next
/// completed tick. Returns whether the tick succeeded.
pub fn run_tick(
    engine: &mut SimulationEngine,
    coordinator: &SharedFieldCoordinator,
    dt: f64,
) -> bool {
    let started = Instant::now();
    coordinator.apply_pending(engine);

    let attempted = engine.tick_count() + 1;
    let checkpoint = engine.checkpoint();
    let result = panic::catch_unwind(AssertUnwindSafe(|| engine.tick(dt)));
    let metrics = coordinator.metrics();
    match result {
        Ok(Ok(report)) => {
            metrics.record_tick(started.elapsed(), &report);
            coordinator.publish(engine.snapshot());
            true
        }
        Ok(Err(e)) => {
            metrics.record_failure(attempted, &e.to_string());
            false
        }
        Err(payload) => {
            engine.restore(checkpoint);
            metrics.record_failure(attempted, &panic_message(payload.as_ref()));
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Handle to the running simulation thread.
pub struct SimulationWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<SimulationEngine>>,
}

impl SimulationWorker {
    /// Moves `engine` onto a new thread named `arkhe-sim` and starts ticking.
    pub fn spawn(
        mut engine: SimulationEngine,
        coordinator: Arc<SharedFieldCoordinator>,
        config: WorkerConfig,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("arkhe-sim".to_string())
            .spawn(move || {
                tracing::info!(
                    period_ms = config.period.as_millis() as u64,
                    dt = config.dt,
                    "Simulation loop started"
                );
                while flag.load(Ordering::SeqCst) {
                    let started = Instant::now();
                    run_tick(&mut engine, &coordinator, config.dt);

                    let elapsed = started.elapsed();
                    if elapsed >= config.period {
                        coordinator
                            .metrics()
                            .record_overrun(engine.tick_count(), elapsed - config.period);
                        continue;
                    }
                    let deadline = started + config.period;
                    // park_timeout can wake spuriously; keep waiting until the
                    // deadline or a stop request.
                    while flag.load(Ordering::SeqCst) {
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        thread::park_timeout(deadline - now);
                    }
                }
                engine.stop();
                tracing::info!(
                    ticks = engine.tick_count(),
                    sim_time = engine.sim_time(),
                    "Simulation loop exited"
                );
                engine
            })?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Lets the in-flight tick finish, then joins the thread and hands the
    /// stopped engine back.
    pub fn shutdown(mut self) -> Option<SimulationEngine> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Option<SimulationEngine> {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.handle.take()?;
        handle.thread().unpark();
        match handle.join() {
            Ok(engine) => Some(engine),
            Err(_) => {
                tracing::error!("Simulation thread panicked outside a tick");
                None
            }
        }
    }
}

impl Drop for SimulationWorker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
