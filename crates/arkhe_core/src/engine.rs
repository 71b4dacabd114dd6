//! Simulation engine: field, agents and the evolution protocol, advanced one
//! tick at a time.

use crate::agent::AgentLogic;
use crate::config::{AgentConfig, AppConfig};
use crate::constraint::ConstraintEngine;
use crate::error::{Result, SimError};
use crate::evolution::{EvolutionProtocol, EvolutionReport};
use crate::field::ScalarField;
use crate::snapshot::FieldSnapshot;
use arkhe_data::{Agent, AgentInfo, EngineStats};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Engine state as of the last completed tick. Cheap to take: the grid is
/// shared until the next write, and only the agent list is copied.
#[derive(Clone, Debug)]
pub struct TickCheckpoint {
    tick: u64,
    sim_time: f64,
    field: ScalarField,
    agents: Vec<Agent>,
}

impl TickCheckpoint {
    pub fn tick(&self) -> u64 {
        self.tick
    }
}

/// Lifecycle of a constructed engine. An engine that failed to build is
/// represented by its absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Running,
    Stopped,
}

pub struct SimulationEngine {
    state: EngineState,
    tick: u64,
    sim_time: f64,
    field: ScalarField,
    agents: Vec<Agent>,
    agent_params: AgentConfig,
    protocol: EvolutionProtocol,
    rng: Box<dyn RngCore + Send>,
    births: u64,
    deaths: u64,
}

impl SimulationEngine {
    /// Builds the engine with a ChaCha8 source seeded from the config, or from
    /// OS entropy when no seed is set.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let rng: Box<dyn RngCore + Send> = match config.simulation.seed {
            Some(seed) => Box::new(ChaCha8Rng::seed_from_u64(seed)),
            None => Box::new(ChaCha8Rng::from_entropy()),
        };
        Self::with_rng(config, rng)
    }

    /// Builds the engine around a caller-supplied random source.
    pub fn with_rng(config: &AppConfig, mut rng: Box<dyn RngCore + Send>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| SimError::config(e.to_string()))?;

        let extent = config.field.extent;
        let count = u32::try_from(config.simulation.agent_count)
            .map_err(|_| SimError::config("agent count does not fit in u32"))?;
        let agents = (0..count)
            .map(|id| {
                Agent::spawn_random(id, extent, config.agent.initial_health, rng.as_mut())
            })
            .collect::<Vec<_>>();

        tracing::info!(
            agents = agents.len(),
            extent,
            threshold = config.constraint.threshold,
            "Simulation engine initialized"
        );

        Ok(Self {
            state: EngineState::Running,
            tick: 0,
            sim_time: 0.0,
            field: ScalarField::new(extent),
            agents,
            agent_params: config.agent.clone(),
            protocol: EvolutionProtocol::new(ConstraintEngine::new(config.constraint.threshold)),
            rng,
            births: 0,
            deaths: 0,
        })
    }

    /// Advances the simulation by `dt` simulated seconds.
    ///
    /// Agents step in ascending id order, then the evolution protocol rolls
    /// back inadmissible moves. A tick that fails leaves the engine exactly as
    /// it was before the tick. A stopped engine ignores ticks.
    pub fn tick(&mut self, dt: f64) -> Result<EvolutionReport> {
        if self.state == EngineState::Stopped {
            return Ok(EvolutionReport::default());
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimError::InvalidTimestep(dt));
        }

        let checkpoint = self.checkpoint();
        self.advance(dt).inspect_err(|_| self.restore(checkpoint))
    }

    fn advance(&mut self, dt: f64) -> Result<EvolutionReport> {
        self.tick += 1;
        self.sim_time += dt;

        for agent in self.agents.iter_mut() {
            agent.step(dt, &self.agent_params, &mut self.field, self.rng.as_mut());
        }

        let report = self.protocol.apply_evolution(&mut self.agents, &self.field);

        if let Some(agent) = self.agents.iter().find(|a| !a.is_finite()) {
            return Err(SimError::NonFiniteState { agent: agent.id });
        }

        Ok(report)
    }

    /// Captures the state of the last completed tick.
    pub fn checkpoint(&self) -> TickCheckpoint {
        TickCheckpoint {
            tick: self.tick,
            sim_time: self.sim_time,
            field: self.field.clone(),
            agents: self.agents.clone(),
        }
    }

    /// Rolls the clock, field and agents back to `checkpoint`. The random
    /// source is not rewound.
    pub fn restore(&mut self, checkpoint: TickCheckpoint) {
        tracing::debug!(
            from = self.tick,
            to = checkpoint.tick,
            "Rolling back partial tick"
        );
        self.tick = checkpoint.tick;
        self.sim_time = checkpoint.sim_time;
        self.field = checkpoint.field;
        self.agents = checkpoint.agents;
    }

    /// Adds `strength` to the live cell containing `(x, y, z)`.
    ///
    /// Returns `false` when the coordinates fall outside the grid, the
    /// strength is not representable as a finite `f32`, or the cell would
    /// become non-finite; the field is untouched in that case.
    pub fn inject_signal(&mut self, x: f64, y: f64, z: f64, strength: f64) -> bool {
        let strength = strength as f32;
        if !strength.is_finite() {
            return false;
        }
        self.field.write(x, y, z, strength)
    }

    pub fn stats(&self) -> EngineStats {
        let agent_count = self.agents.len();
        let avg_health = if agent_count > 0 {
            self.agents.iter().map(|a| a.health).sum::<f64>() / agent_count as f64
        } else {
            0.0
        };
        EngineStats {
            sim_time: self.sim_time,
            agent_count,
            avg_health,
            bond_count: self.agents.iter().map(|a| a.bonds.len()).sum::<usize>() / 2,
            births: self.births,
            deaths: self.deaths,
        }
    }

    /// `None` when `id` is outside `[0, agent_count)`.
    pub fn agent_info(&self, id: u32) -> Option<AgentInfo> {
        self.agents.get(id as usize).map(Agent::info)
    }

    /// Freezes the current state. The grid is shared, not copied.
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            tick: self.tick,
            sim_time: self.sim_time,
            captured_at: chrono::Utc::now(),
            stats: self.stats(),
            grid: self.field.read_all(),
            agents: Arc::new(self.agents.iter().map(Agent::info).collect()),
        }
    }

    pub fn stop(&mut self) {
        if self.state != EngineState::Stopped {
            tracing::info!(tick = self.tick, "Simulation engine stopped");
        }
        self.state = EngineState::Stopped;
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn field(&self) -> &ScalarField {
        &self.field
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn protocol(&self) -> &EvolutionProtocol {
        &self.protocol
    }
}
