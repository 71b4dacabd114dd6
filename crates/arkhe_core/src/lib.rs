//! # Arkhe Core
//!
//! The deterministic simulation behind the Arkhe process: a population of
//! agents random-walking through a shared 3D scalar field.
//!
//! This crate contains:
//! - The scalar field with copy-on-write snapshots
//! - Agent motion and deposit rules
//! - The state-exclusion criterion and the evolution protocol that applies it
//! - The tick-driven simulation engine
//! - Configuration, tick metrics and structured logging
//!
//! ## Example
//!
//! ```
//! use arkhe_core::config::AppConfig;
//! use arkhe_core::engine::SimulationEngine;
//!
//! let mut config = AppConfig::default();
//! config.simulation.agent_count = 10;
//! config.simulation.seed = Some(42);
//!
//! let mut engine = SimulationEngine::new(&config).unwrap();
//! engine.tick(0.1).unwrap();
//! assert_eq!(engine.stats().agent_count, 10);
//! ```

/// Agent motion and field deposits
pub mod agent;
/// Configuration management for simulation parameters
pub mod config;
/// State-exclusion criterion
pub mod constraint;
/// Tick-driven simulation engine
pub mod engine;
/// Typed simulation errors
pub mod error;
/// Evolution protocol applying the exclusion criterion each tick
pub mod evolution;
/// 3D scalar field
pub mod field;
/// Tick metrics and structured logging
pub mod metrics;
/// Frozen per-tick snapshots
pub mod snapshot;

pub use agent::AgentLogic;
pub use arkhe_data::{Agent, AgentInfo, EngineStats};
pub use engine::{EngineState, SimulationEngine, TickCheckpoint};
pub use error::SimError;
pub use metrics::{init_logging, Metrics};
pub use snapshot::FieldSnapshot;
