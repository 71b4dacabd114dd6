mod common;

use arkhe_lib::app::{run_tick, SimulationWorker};
use arkhe_lib::model::error::SimError;
use common::EngineBuilder;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Random source that panics on every `panic_every`-th draw after warm-up.
struct FaultyRng {
    inner: ChaCha8Rng,
    draws: Arc<AtomicU64>,
    warmup: u64,
    panic_every: u64,
}

impl FaultyRng {
    fn boxed(warmup: u64, panic_every: u64) -> (Box<dyn RngCore + Send>, Arc<AtomicU64>) {
        let draws = Arc::new(AtomicU64::new(0));
        let rng = Self {
            inner: ChaCha8Rng::seed_from_u64(9),
            draws: Arc::clone(&draws),
            warmup,
            panic_every,
        };
        (Box::new(rng), draws)
    }

    fn draw(&mut self) {
        let n = self.draws.fetch_add(1, Ordering::SeqCst) + 1;
        if n > self.warmup && (n - self.warmup) % self.panic_every == 0 {
            panic!("entropy source failed at draw {n}");
        }
    }
}

impl RngCore for FaultyRng {
    fn next_u32(&mut self) -> u32 {
        self.draw();
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draw();
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draw();
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draw();
        self.inner.try_fill_bytes(dest)
    }
}

fn deposit_per_tick(config: &arkhe_lib::model::config::AppConfig) -> f64 {
    (config.agent.deposit_rate * config.simulation.dt as f32) as f64
}

#[test]
fn test_panicking_tick_is_contained() {
    // Three draws per agent at spawn, three per agent per step. With four
    // agents a fault every thirteenth draw fails every second attempt.
    let (rng, _draws) = FaultyRng::boxed(3 * 4, 13);
    let (mut engine, coordinator, config) = EngineBuilder::new()
        .with_agents(4)
        .with_extent(16)
        .with_rng(rng)
        .build_shared();

    let mut failures = 0;
    for _ in 0..10 {
        if !run_tick(&mut engine, &coordinator, config.simulation.dt) {
            failures += 1;
        }
    }

    assert_eq!(failures, 5);
    assert_eq!(coordinator.metrics().failure_count(), failures);
    assert_eq!(coordinator.published_count(), 10 - failures);
    assert_eq!(engine.tick_count(), 5);

    let snapshot = coordinator.current_snapshot();
    assert_eq!(snapshot.tick, engine.tick_count());
    let expected = 5.0 * 4.0 * deposit_per_tick(&config);
    assert!(
        (snapshot.grid.total() - expected).abs() < 1e-5,
        "Grid total {} carries deposits from failed ticks, expected {}",
        snapshot.grid.total(),
        expected
    );
    assert_agents_in_bounds!(engine);
}

#[test]
fn test_tick_failing_midway_is_rolled_back() {
    // Fails on agent 2's first draw of tick 1, after agents 0 and 1 have
    // already moved and deposited.
    let (rng, _draws) = FaultyRng::boxed(3 * 4, 3 * 2 + 1);
    let (mut engine, coordinator, config) = EngineBuilder::new()
        .with_agents(4)
        .with_extent(16)
        .with_rng(rng)
        .build_shared();
    let before = engine.snapshot();

    assert!(!run_tick(&mut engine, &coordinator, config.simulation.dt));

    assert_eq!(coordinator.metrics().failure_count(), 1);
    assert_eq!(coordinator.published_count(), 0);
    assert_eq!(coordinator.current_snapshot().tick, 0);
    assert_eq!(coordinator.current_snapshot().grid.total(), 0.0);

    assert_eq!(engine.tick_count(), 0);
    assert_eq!(engine.sim_time(), 0.0);
    let after = engine.snapshot();
    assert_eq!(before.agents, after.agents);
    assert_eq!(before.grid, after.grid);
}

#[test]
fn test_worker_survives_panicking_ticks() {
    // 24 draws per tick with eight agents, so every second attempt fails.
    let (rng, draws) = FaultyRng::boxed(3 * 8, 25);
    let (engine, coordinator, config) = EngineBuilder::new()
        .with_agents(8)
        .with_extent(16)
        .with_tick_hz(200.0)
        .with_rng(rng)
        .build_shared();
    let worker =
        SimulationWorker::spawn(engine, Arc::clone(&coordinator), (&config).into()).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while coordinator.published_count() < 20 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(worker.is_running(), "Worker died after a panicking tick");

    let engine = worker.shutdown().unwrap();
    assert!(engine.tick_count() >= 20);
    assert!(coordinator.metrics().failure_count() > 0);
    assert_eq!(coordinator.current_snapshot().tick, engine.tick_count());
    assert_eq!(coordinator.published_count(), engine.tick_count());
    assert!(draws.load(Ordering::SeqCst) > 3 * 8);
}

#[test]
fn test_invalid_timestep_leaves_state_untouched() {
    let (mut engine, coordinator, _) = EngineBuilder::new()
        .with_agents(5)
        .with_extent(16)
        .build_shared();
    let before = engine.snapshot();

    for dt in [f64::NAN, f64::INFINITY, 0.0, -0.1] {
        assert!(matches!(engine.tick(dt), Err(SimError::InvalidTimestep(_))));
        assert!(!run_tick(&mut engine, &coordinator, dt));
    }

    assert_eq!(coordinator.published_count(), 0);
    assert_eq!(engine.tick_count(), 0);
    assert_eq!(engine.sim_time(), 0.0);
    let after = engine.snapshot();
    assert_eq!(before.agents, after.agents);
    assert_eq!(before.grid, after.grid);
}

#[test]
fn test_stopped_engine_ignores_ticks() {
    let (mut engine, _) = EngineBuilder::new().with_agents(3).with_extent(10).build();
    engine.tick(0.1).unwrap();
    engine.stop();

    let report = engine.tick(0.1).unwrap();
    assert_eq!(report.evaluated, 0);
    assert_eq!(engine.tick_count(), 1);
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = EngineBuilder::new().config().clone();
    config.field.extent = 1;
    assert!(matches!(
        arkhe_lib::model::engine::SimulationEngine::new(&config),
        Err(SimError::Config(_))
    ));

    let mut config = EngineBuilder::new().config().clone();
    config.simulation.dt = -1.0;
    assert!(matches!(
        arkhe_lib::model::engine::SimulationEngine::new(&config),
        Err(SimError::Config(_))
    ));
}
