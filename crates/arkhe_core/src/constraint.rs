//! State-exclusion criterion.
//!
//! A candidate state is admissible when its projection onto the local field
//! gradient stays strictly below a threshold. NaN anywhere in the inputs makes
//! the comparison false, so such states are inadmissible.

use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: f64 = 0.95;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct AdmissibilityDecision {
    pub admissible: bool,
    pub projection: f64,
}

#[inline]
pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// `dot(state, gradient) < threshold`.
#[inline]
pub fn is_admissible(state: [f64; 3], gradient: [f64; 3], threshold: f64) -> bool {
    dot(state, gradient) < threshold
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintEngine {
    threshold: f64,
}

impl Default for ConstraintEngine {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ConstraintEngine {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_admissible(&self, state: [f64; 3], gradient: [f64; 3]) -> bool {
        is_admissible(state, gradient, self.threshold)
    }

    pub fn decide(&self, state: [f64; 3], gradient: [f64; 3]) -> AdmissibilityDecision {
        let projection = dot(state, gradient);
        AdmissibilityDecision {
            admissible: projection < self.threshold,
            projection,
        }
    }
}
