//! Core data structures for the Arkhe simulation.

pub mod agent;
pub mod control;
pub mod stats;
