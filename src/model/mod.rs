pub use arkhe_core::AgentLogic;
pub mod agent {
    pub use arkhe_core::agent::*;
}
pub mod config {
    pub use arkhe_core::config::*;
}
pub mod constraint {
    pub use arkhe_core::constraint::*;
}
pub mod engine {
    pub use arkhe_core::engine::*;
}
pub mod error {
    pub use arkhe_core::error::*;
}
pub mod evolution {
    pub use arkhe_core::evolution::*;
}
pub mod field {
    pub use arkhe_core::field::*;
}
pub mod metrics {
    pub use arkhe_core::metrics::*;
}
pub mod snapshot {
    pub use arkhe_core::snapshot::*;
}

pub mod state {
    pub use arkhe_data::*;
}
