//! Status snapshot returned to operators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::heartbeat::ComponentRole;

/// Liveness classification of a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentStatus {
    Alive,
    Stale,
    Unknown,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComponentStatus::Alive => "ALIVE",
            ComponentStatus::Stale => "STALE",
            ComponentStatus::Unknown => "UNKNOWN",
        })
    }
}

/// Lifecycle of the controller process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Initializing,
    Running,
    ShuttingDown,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControllerState::Initializing => "initializing",
            ControllerState::Running => "running",
            ControllerState::ShuttingDown => "shutting_down",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentReport {
    pub status: ComponentStatus,
    pub role: ComponentRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(
        default,
        with = "crate::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_heartbeat: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastSelection {
    pub walk: String,
    pub category: String,
    #[serde(with = "crate::timestamp")]
    pub selected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: ControllerState,
    pub active_profile: String,
    pub uptime_secs: u64,
    /// Total walks selected since start.
    pub selections: u64,
    pub components: BTreeMap<String, ComponentReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_selection: Option<LastSelection>,
}

impl StatusSnapshot {
    /// Component ids with the given status, in id order.
    pub fn with_status(&self, status: ComponentStatus) -> impl Iterator<Item = &str> {
        self.components
            .iter()
            .filter(move |(_, report)| report.status == status)
            .map(|(id, _)| id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_spelling() {
        assert_eq!(serde_json::to_value(ComponentStatus::Stale).unwrap(), "STALE");
        assert_eq!(ComponentStatus::Unknown.to_string(), "UNKNOWN");
        assert_eq!(
            serde_json::to_value(ControllerState::ShuttingDown).unwrap(),
            "shutting_down"
        );
    }

    #[test]
    fn filter_by_status() {
        let mut components = BTreeMap::new();
        for (id, status) in [
            ("timer", ComponentStatus::Alive),
            ("button_switch", ComponentStatus::Stale),
            ("matrix_driver", ComponentStatus::Alive),
        ] {
            components.insert(
                id.to_string(),
                ComponentReport {
                    status,
                    role: ComponentRole::infer(id),
                    host: None,
                    last_heartbeat: None,
                },
            );
        }
        let snapshot = StatusSnapshot {
            state: ControllerState::Running,
            active_profile: "default".to_string(),
            uptime_secs: 3,
            selections: 0,
            components,
            last_selection: None,
        };

        let alive: Vec<_> = snapshot.with_status(ComponentStatus::Alive).collect();
        assert_eq!(alive, vec!["matrix_driver", "timer"]);
    }
}
