use serde::{Deserialize, Serialize};

/// Cartesian position in grid units.
pub type Vec3 = [f64; 3];

/// A single agent embedded in the scalar field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: u32,
    pub position: Vec3,
    pub health: f64,
    /// Ids of bonded agents. Always empty for now; the stats contract already
    /// reports the pair count.
    pub bonds: Vec<u32>,
    /// Position before the most recent step, used to roll a rejected move back.
    #[serde(skip)]
    pub previous_position: Vec3,
}

impl Agent {
    pub fn new(id: u32, position: Vec3, health: f64) -> Self {
        Self {
            id,
            position,
            health,
            bonds: Vec::new(),
            previous_position: position,
        }
    }

    /// Displacement of the most recent step.
    pub fn displacement(&self) -> Vec3 {
        [
            self.position[0] - self.previous_position[0],
            self.position[1] - self.previous_position[1],
            self.position[2] - self.previous_position[2],
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite()) && self.health.is_finite()
    }

    pub fn info(&self) -> AgentInfo {
        AgentInfo {
            id: self.id,
            health: self.health,
            position: self.position,
            bonds: self.bonds.len(),
        }
    }
}

/// Read-only view of an agent handed to control-plane callers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AgentInfo {
    pub id: u32,
    pub health: f64,
    pub position: Vec3,
    pub bonds: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_has_no_displacement() {
        let agent = Agent::new(7, [10.0, 20.0, 30.0], 1.0);
        assert_eq!(agent.displacement(), [0.0, 0.0, 0.0]);
        assert_eq!(agent.info().bonds, 0);
    }

    #[test]
    fn test_previous_position_not_serialized() {
        let mut agent = Agent::new(1, [1.0, 2.0, 3.0], 0.5);
        agent.previous_position = [9.0, 9.0, 9.0];
        let json = serde_json::to_string(&agent).unwrap();
        assert!(!json.contains("previous_position"));
    }
}
