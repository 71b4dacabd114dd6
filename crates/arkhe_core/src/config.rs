//! Configuration management for simulation parameters.
//!
//! Strongly-typed configuration structures that map to `arkhe.toml`.
//!
//! ## Configuration Hierarchy
//!
//! 1. Default values (hardcoded in `Default` impls)
//! 2. `arkhe.toml` file (overrides defaults)
//! 3. Command-line flags applied by the binary
//!
//! ## Example `arkhe.toml`
//!
//! ```toml
//! [simulation]
//! agent_count = 150
//! dt = 0.1
//! tick_hz = 10.0
//! seed = 42
//! deterministic = true
//!
//! [constraint]
//! threshold = 0.95
//!
//! [control]
//! bind = "127.0.0.1:3000"
//! max_pending_injections = 1024
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tick loop and population parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    pub agent_count: usize,
    pub dt: f64,
    pub tick_hz: f64,
    pub seed: Option<u64>,
    pub deterministic: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            agent_count: 150,
            dt: 0.1,
            tick_hz: 10.0,
            seed: None,
            deterministic: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FieldConfig {
    /// Cells per axis; the grid holds `extent^3` cells.
    pub extent: usize,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self { extent: 100 }
    }
}

/// Agent motion and deposit rules.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AgentConfig {
    /// Half-range of the per-axis random walk, in units per simulated second.
    pub step_magnitude: f64,
    /// Field deposit per simulated second at the agent's cell.
    pub deposit_rate: f32,
    pub initial_health: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            step_magnitude: 5.0,
            deposit_rate: 0.01,
            initial_health: 1.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ConstraintConfig {
    pub threshold: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self { threshold: 0.95 }
    }
}

/// Control-plane server settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ControlConfig {
    pub enabled: bool,
    pub bind: String,
    /// Frames buffered per telemetry subscriber before it starts lagging.
    pub telemetry_capacity: usize,
    /// Injections that may wait for the next tick before new ones are rejected.
    pub max_pending_injections: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1:3000".to_string(),
            telemetry_capacity: 64,
            max_pending_injections: 1024,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub field: FieldConfig,
    pub agent: AgentConfig,
    pub constraint: ConstraintConfig,
    pub control: ControlConfig,
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description
    /// of the first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        // Simulation validation
        anyhow::ensure!(
            self.simulation.agent_count <= 100_000,
            "Agent count too large (max 100000)"
        );
        anyhow::ensure!(
            self.simulation.dt.is_finite() && self.simulation.dt > 0.0,
            "Timestep must be finite and positive"
        );
        anyhow::ensure!(
            self.simulation.tick_hz.is_finite()
                && self.simulation.tick_hz > 0.0
                && self.simulation.tick_hz <= 1000.0,
            "Tick rate must be in (0, 1000] Hz"
        );
        anyhow::ensure!(
            !self.simulation.deterministic || self.simulation.seed.is_some(),
            "Deterministic mode requires a seed"
        );

        // Field validation
        anyhow::ensure!(self.field.extent >= 3, "Field extent too small (min 3)");
        anyhow::ensure!(self.field.extent <= 512, "Field extent too large (max 512)");

        // Agent validation
        anyhow::ensure!(
            self.agent.step_magnitude.is_finite() && self.agent.step_magnitude >= 0.0,
            "Step magnitude must be finite and non-negative"
        );
        anyhow::ensure!(
            self.agent.deposit_rate.is_finite() && self.agent.deposit_rate >= 0.0,
            "Deposit rate must be finite and non-negative"
        );
        anyhow::ensure!(
            self.agent.initial_health.is_finite(),
            "Initial health must be finite"
        );

        anyhow::ensure!(
            self.constraint.threshold.is_finite(),
            "Constraint threshold must be finite"
        );

        anyhow::ensure!(
            self.control.telemetry_capacity > 0,
            "Telemetry capacity must be positive"
        );
        anyhow::ensure!(
            self.control.max_pending_injections > 0,
            "Injection queue limit must be positive"
        );

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`.
    ///
    /// A missing file yields the defaults; a present but invalid file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Wall-clock period between tick starts.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.simulation.tick_hz)
    }
}
