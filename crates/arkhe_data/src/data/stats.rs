use serde::{Deserialize, Serialize};

/// Aggregate population statistics, recomputed from live state on demand.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EngineStats {
    pub sim_time: f64,
    pub agent_count: usize,
    pub avg_health: f64,
    pub bond_count: usize,
    /// Reserved: the engine has no birth/death yet.
    pub births: u64,
    pub deaths: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusKind {
    Operational,
    Error,
}

/// Telemetry answer for `get_system_status`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SystemStatus {
    pub status: StatusKind,
    pub agents_alive: usize,
    pub simulation_time: f64,
    pub average_health: f64,
    pub field_active: bool,
    pub tick: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SystemStatus {
    pub fn operational(stats: &EngineStats, tick: u64, field_active: bool) -> Self {
        Self {
            status: StatusKind::Operational,
            agents_alive: stats.agent_count,
            simulation_time: stats.sim_time,
            average_health: stats.avg_health,
            field_active,
            tick,
            message: None,
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            status: StatusKind::Error,
            agents_alive: 0,
            simulation_time: 0.0,
            average_health: 0.0,
            field_active: false,
            tick: 0,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_kind_wire_names() {
        let json = serde_json::to_string(&StatusKind::Operational).unwrap();
        assert_eq!(json, "\"OPERATIONAL\"");
        let json = serde_json::to_string(&StatusKind::Error).unwrap();
        assert_eq!(json, "\"ERROR\"");
    }

    #[test]
    fn test_error_status_carries_message() {
        let status = SystemStatus::error("simulation engine not loaded");
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["status"], "ERROR");
        assert_eq!(value["message"], "simulation engine not loaded");
        assert_eq!(value["field_active"], false);
    }

    #[test]
    fn test_operational_status_omits_message() {
        let stats = EngineStats {
            sim_time: 5.0,
            agent_count: 150,
            avg_health: 1.0,
            ..Default::default()
        };
        let value = serde_json::to_value(SystemStatus::operational(&stats, 50, true)).unwrap();
        assert_eq!(value["agents_alive"], 150);
        assert!(value.get("message").is_none());
    }
}
