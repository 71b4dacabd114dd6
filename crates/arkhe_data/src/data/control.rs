use serde::{Deserialize, Serialize};

/// External request to add `strength` to the cell containing `(x, y, z)`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct InjectRequest {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub strength: f64,
}

/// Result of an injection request. Never an error: every outcome is a value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum InjectOutcome {
    /// Accepted; becomes visible in the snapshot published after the next tick.
    Queued { cell: [usize; 3], message: String },
    /// Outside the grid or non-finite; the field is untouched.
    Ignored { reason: String },
    /// The process is shutting down.
    Rejected { reason: String },
    /// The simulation never started.
    Unavailable { reason: String },
}

impl InjectOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

/// A single cell read from a published snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CellReading {
    pub cell: Option<[usize; 3]>,
    pub value: Option<f32>,
    pub tick: u64,
}
