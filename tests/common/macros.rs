/// Asserts that the cell containing the given coordinates holds exactly `expected`.
#[macro_export]
macro_rules! assert_cell_value {
    ($snapshot:expr, $x:expr, $y:expr, $z:expr, $expected:expr) => {
        let reading = $snapshot.cell($x, $y, $z);
        assert_eq!(
            reading.value,
            Some($expected),
            "Cell at ({}, {}, {}) mismatch",
            $x,
            $y,
            $z
        );
    };
}

/// Asserts that every agent in the engine sits inside the grid.
#[macro_export]
macro_rules! assert_agents_in_bounds {
    ($engine:expr) => {
        let extent = $engine.field().extent() as f64;
        for agent in $engine.agents() {
            for axis in agent.position {
                assert!(
                    axis.is_finite() && axis >= 0.0 && axis < extent,
                    "Agent {} left the grid: {:?}",
                    agent.id,
                    agent.position
                );
            }
        }
    };
}

/// Asserts that a snapshot reports the expected population.
#[macro_export]
macro_rules! assert_population {
    ($snapshot:expr, $count:expr) => {
        assert_eq!(
            $snapshot.stats.agent_count, $count,
            "Population count mismatch"
        );
    };
}
