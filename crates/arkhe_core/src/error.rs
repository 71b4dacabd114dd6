//! Error types for the simulation core.

use thiserror::Error;

/// Failures a single tick can report. The worker logs them and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// The timestep was zero, negative or not finite.
    #[error("Invalid timestep: {0}")]
    InvalidTimestep(f64),

    /// An agent ended a step with a non-finite position or health.
    #[error("Agent {agent} reached a non-finite state")]
    NonFiniteState { agent: u32 },

    /// The engine could not be built from the supplied configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    #[must_use]
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
