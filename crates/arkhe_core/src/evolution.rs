//! Bio-Arkhe evolution protocol.
//!
//! Runs after every agent has stepped. Each agent's candidate state is the
//! displacement it just made; the gradient is estimated at the cell it left.
//! Moves whose projection onto that gradient reaches the exclusion threshold
//! are rolled back. Rejected moves are not retried.

use crate::agent::AgentLogic;
use crate::constraint::{AdmissibilityDecision, ConstraintEngine};
use crate::field::ScalarField;
use arkhe_data::Agent;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome counters for one evolution pass.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvolutionReport {
    pub evaluated: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EvolutionProtocol {
    constraint: ConstraintEngine,
}

impl EvolutionProtocol {
    pub fn new(constraint: ConstraintEngine) -> Self {
        Self { constraint }
    }

    pub fn constraint(&self) -> &ConstraintEngine {
        &self.constraint
    }

    /// Admissibility of the agent's last move against the field as it is now.
    pub fn evaluate(&self, agent: &Agent, field: &ScalarField) -> AdmissibilityDecision {
        let [px, py, pz] = agent.previous_position;
        let gradient = field
            .cell_of(px, py, pz)
            .map_or([0.0; 3], |cell| field.gradient(cell));
        self.constraint.decide(agent.displacement(), gradient)
    }

    pub fn apply_evolution(&self, agents: &mut [Agent], field: &ScalarField) -> EvolutionReport {
        // Decisions only read the field, so they can be computed in parallel and
        // committed afterwards in id order.
        let decisions: Vec<bool> = agents
            .par_iter()
            .map(|agent| self.evaluate(agent, field).admissible)
            .collect();

        let mut report = EvolutionReport {
            evaluated: agents.len(),
            rejected: 0,
        };
        for (agent, admissible) in agents.iter_mut().zip(decisions) {
            if !admissible {
                agent.revert();
                report.rejected += 1;
            }
        }
        report
    }
}
