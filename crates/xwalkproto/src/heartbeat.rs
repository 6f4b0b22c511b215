//! Heartbeats and component roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::WireMessage;

/// What a component does at a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRole {
    ButtonSwitch,
    MatrixDriver,
    ButtonLights,
    Timer,
    Scheduler,
    Api,
    AudioPlayer,
    #[serde(other)]
    Other,
}

impl ComponentRole {
    /// Guess a role from a component id such as `button-lights` or
    /// `matrix_driver_2`.
    pub fn infer(component_id: &str) -> Self {
        let id = component_id.to_ascii_lowercase().replace('-', "_");
        if id.contains("switch") {
            ComponentRole::ButtonSwitch
        } else if id.contains("matrix") {
            ComponentRole::MatrixDriver
        } else if id.contains("light") {
            ComponentRole::ButtonLights
        } else if id.contains("timer") {
            ComponentRole::Timer
        } else if id.contains("sched") {
            ComponentRole::Scheduler
        } else if id.contains("audio") {
            ComponentRole::AudioPlayer
        } else if id.contains("api") {
            ComponentRole::Api
        } else {
            ComponentRole::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentRole::ButtonSwitch => "button_switch",
            ComponentRole::MatrixDriver => "matrix_driver",
            ComponentRole::ButtonLights => "button_lights",
            ComponentRole::Timer => "timer",
            ComponentRole::Scheduler => "scheduler",
            ComponentRole::Api => "api",
            ComponentRole::AudioPlayer => "audio_player",
            ComponentRole::Other => "other",
        }
    }
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComponentRole {
    type Err = std::convert::Infallible;

    /// Never fails: unknown names map to `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_value(serde_json::Value::String(s.to_string()))
            .unwrap_or(ComponentRole::Other))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub component: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ComponentRole>,

    #[serde(
        default,
        with = "crate::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub sent_at: Option<DateTime<Utc>>,

    /// Set on the first beat after a component starts.
    #[serde(default)]
    pub initial: bool,
}

impl Heartbeat {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            host: None,
            role: None,
            sent_at: None,
            initial: false,
        }
    }

    pub fn with_role(mut self, role: ComponentRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn initial(mut self, initial: bool) -> Self {
        self.initial = initial;
        self
    }

    pub fn sent_at(mut self, at: DateTime<Utc>) -> Self {
        self.sent_at = Some(at);
        self
    }

    /// Declared role, or one inferred from the component id.
    pub fn role(&self) -> ComponentRole {
        self.role
            .unwrap_or_else(|| ComponentRole::infer(&self.component))
    }
}

impl WireMessage for Heartbeat {
    const KIND: &'static str = "heartbeat";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_roles_from_ids() {
        assert_eq!(ComponentRole::infer("button_switch"), ComponentRole::ButtonSwitch);
        assert_eq!(ComponentRole::infer("button-lights"), ComponentRole::ButtonLights);
        assert_eq!(ComponentRole::infer("Matrix-Driver-2"), ComponentRole::MatrixDriver);
        assert_eq!(ComponentRole::infer("timer"), ComponentRole::Timer);
        assert_eq!(ComponentRole::infer("scheduler"), ComponentRole::Scheduler);
        assert_eq!(ComponentRole::infer("audio_player"), ComponentRole::AudioPlayer);
        assert_eq!(ComponentRole::infer("api"), ComponentRole::Api);
        assert_eq!(ComponentRole::infer("toaster"), ComponentRole::Other);
    }

    #[test]
    fn unknown_role_decodes_as_other() {
        let beat =
            Heartbeat::from_bytes(br#"{"component":"fog","role":"fog_machine"}"#).unwrap();
        assert_eq!(beat.role(), ComponentRole::Other);
    }

    #[test]
    fn missing_role_is_inferred() {
        let beat = Heartbeat::from_bytes(
            br#"{"host":"crosswalk-b","component":"matrix_driver","sent_at":"2025-07-01T09:00:00.123456","initial":true}"#,
        )
        .unwrap();
        assert_eq!(beat.role, None);
        assert_eq!(beat.role(), ComponentRole::MatrixDriver);
        assert!(beat.initial);
        assert_eq!(beat.host.as_deref(), Some("crosswalk-b"));
    }

    #[test]
    fn role_from_str() {
        assert_eq!("timer".parse::<ComponentRole>().unwrap(), ComponentRole::Timer);
        assert_eq!("nope".parse::<ComponentRole>().unwrap(), ComponentRole::Other);
    }
}
