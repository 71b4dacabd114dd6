//! Process-level wiring around the simulation core: the coordinator shared
//! with the control plane, the tick worker, and shutdown handling.

pub mod coordinator;
pub mod shutdown;
pub mod worker;

pub use coordinator::SharedFieldCoordinator;
pub use shutdown::ShutdownManager;
pub use worker::{run_tick, SimulationWorker, WorkerConfig};
