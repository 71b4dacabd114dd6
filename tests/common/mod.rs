pub mod macros;

use arkhe_lib::app::SharedFieldCoordinator;
use arkhe_lib::model::config::AppConfig;
use arkhe_lib::model::engine::SimulationEngine;
use rand::RngCore;
use std::sync::Arc;

#[allow(dead_code)]
pub struct EngineBuilder {
    config: AppConfig,
    rng: Option<Box<dyn RngCore + Send>>,
}

#[allow(dead_code)]
impl EngineBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.simulation.agent_count = 0;
        config.simulation.seed = Some(42);
        Self { config, rng: None }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.simulation.seed = Some(seed);
        self
    }

    pub fn with_agents(mut self, count: usize) -> Self {
        self.config.simulation.agent_count = count;
        self
    }

    pub fn with_extent(mut self, extent: usize) -> Self {
        self.config.field.extent = extent;
        self
    }

    pub fn with_tick_hz(mut self, hz: f64) -> Self {
        self.config.simulation.tick_hz = hz;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    /// Replaces the seeded ChaCha source with a custom one.
    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn build(self) -> (SimulationEngine, AppConfig) {
        let engine = match self.rng {
            Some(rng) => SimulationEngine::with_rng(&self.config, rng),
            None => SimulationEngine::new(&self.config),
        }
        .expect("Failed to create engine in test builder");
        (engine, self.config)
    }

    /// Builds the engine together with a coordinator seeded from it.
    pub fn build_shared(self) -> (SimulationEngine, Arc<SharedFieldCoordinator>, AppConfig) {
        let (engine, config) = self.build();
        let coordinator = Arc::new(
            SharedFieldCoordinator::for_engine(&engine, config.control.telemetry_capacity)
                .with_queue_limit(config.control.max_pending_injections),
        );
        (engine, coordinator, config)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
