//! Agent motion: a bounded random walk plus a deposit into the field.

use crate::config::AgentConfig;
use crate::field::ScalarField;
use arkhe_data::Agent;
use rand::Rng;

pub trait AgentLogic {
    /// Creates an agent at a uniformly random in-grid position.
    fn spawn_random<R: Rng + ?Sized>(id: u32, extent: usize, health: f64, rng: &mut R) -> Self;

    /// Perturbs the position by up to `step_magnitude * dt` per axis, clamps it
    /// into the grid and deposits `deposit_rate * dt` at the new cell.
    fn step<R: Rng + ?Sized>(
        &mut self,
        dt: f64,
        params: &AgentConfig,
        field: &mut ScalarField,
        rng: &mut R,
    );

    /// Restores the position held before the last step.
    fn revert(&mut self);
}

impl AgentLogic for Agent {
    fn spawn_random<R: Rng + ?Sized>(id: u32, extent: usize, health: f64, rng: &mut R) -> Self {
        let max = upper_bound(extent);
        let position = [
            rng.gen::<f64>() * max,
            rng.gen::<f64>() * max,
            rng.gen::<f64>() * max,
        ];
        Agent::new(id, position, health)
    }

    fn step<R: Rng + ?Sized>(
        &mut self,
        dt: f64,
        params: &AgentConfig,
        field: &mut ScalarField,
        rng: &mut R,
    ) {
        self.previous_position = self.position;
        let max = upper_bound(field.extent());
        for axis in self.position.iter_mut() {
            let jitter = (rng.gen::<f64>() * 2.0 - 1.0) * params.step_magnitude * dt;
            *axis = (*axis + jitter).clamp(0.0, max);
        }
        let [x, y, z] = self.position;
        field.write(x, y, z, params.deposit_rate * dt as f32);
    }

    fn revert(&mut self) {
        self.position = self.previous_position;
    }
}

/// Largest coordinate an agent may occupy; keeps truncation inside the grid.
#[inline]
fn upper_bound(extent: usize) -> f64 {
    extent.saturating_sub(1) as f64
}
