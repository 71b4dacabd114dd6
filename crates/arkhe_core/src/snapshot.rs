//! Frozen view of a completed tick, shared with concurrent readers.

use crate::field::FieldGrid;
use arkhe_data::{AgentInfo, CellReading, EngineStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FieldSnapshot {
    pub tick: u64,
    pub sim_time: f64,
    pub captured_at: DateTime<Utc>,
    pub stats: EngineStats,
    pub grid: FieldGrid,
    pub agents: Arc<Vec<AgentInfo>>,
}

impl FieldSnapshot {
    /// Agents are stored in id order, so ids double as indices.
    pub fn agent(&self, id: u32) -> Option<&AgentInfo> {
        self.agents.get(id as usize).filter(|a| a.id == id)
    }

    pub fn cell(&self, x: f64, y: f64, z: f64) -> CellReading {
        let cell = crate::field::cell_of(self.grid.extent, x, y, z);
        CellReading {
            cell,
            value: cell.and_then(|[ix, iy, iz]| self.grid.get(ix, iy, iz)),
            tick: self.tick,
        }
    }
}
