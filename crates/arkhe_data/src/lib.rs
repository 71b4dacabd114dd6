//! Shared data structures for the Arkhe simulation.
//!
//! Everything here is plain serde data so it can cross the boundary between
//! the simulation worker and the control plane without dragging any engine
//! logic along. Behaviour lives in `arkhe_core`.

pub mod data;

pub use data::agent::{Agent, AgentInfo, Vec3};
pub use data::control::{CellReading, InjectOutcome, InjectRequest};
pub use data::stats::{EngineStats, StatusKind, SystemStatus};
