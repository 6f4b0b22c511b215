//! Control commands broadcast by the controller.
//!
//! Commands are fire-and-forget. A station that misses one simply keeps
//! doing what it was doing until the next command arrives, so every command
//! must be safe to apply twice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::WireMessage;
use crate::heartbeat::ComponentRole;

/// Who should act on a command. Serializes as `"all"` or `{"role": "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetScope {
    All,
    Role(ComponentRole),
}

impl TargetScope {
    pub fn includes(&self, role: ComponentRole) -> bool {
        match self {
            TargetScope::All => true,
            TargetScope::Role(r) => *r == role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    PlayWalk,
    Reset,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub target: TargetScope,
    pub kind: CommandKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,

    #[serde(with = "crate::timestamp")]
    pub issued_at: DateTime<Utc>,
}

impl ControlCommand {
    fn bare(kind: CommandKind, issued_at: DateTime<Utc>) -> Self {
        Self {
            target: TargetScope::All,
            kind,
            walk: None,
            category: None,
            intro: None,
            outro: None,
            audio: None,
            issued_at,
        }
    }

    /// Play a walk everywhere. Fill in clips with the builder methods.
    pub fn play_walk(walk: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        let mut cmd = Self::bare(CommandKind::PlayWalk, issued_at);
        cmd.walk = Some(walk.into());
        cmd
    }

    pub fn reset(issued_at: DateTime<Utc>) -> Self {
        Self::bare(CommandKind::Reset, issued_at)
    }

    pub fn idle(issued_at: DateTime<Utc>) -> Self {
        Self::bare(CommandKind::Idle, issued_at)
    }

    pub fn to_role(mut self, role: ComponentRole) -> Self {
        self.target = TargetScope::Role(role);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_intro(mut self, intro: Option<String>) -> Self {
        self.intro = intro;
        self
    }

    pub fn with_outro(mut self, outro: Option<String>) -> Self {
        self.outro = outro;
        self
    }

    pub fn with_audio(mut self, audio: impl Into<String>) -> Self {
        self.audio = Some(audio.into());
        self
    }
}

impl WireMessage for ControlCommand {
    const KIND: &'static str = "control";
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn target_shapes() {
        let all = serde_json::to_value(TargetScope::All).unwrap();
        assert_eq!(all, serde_json::json!("all"));

        let role = serde_json::to_value(TargetScope::Role(ComponentRole::MatrixDriver)).unwrap();
        assert_eq!(role, serde_json::json!({"role": "matrix_driver"}));
    }

    #[test]
    fn play_walk_json() {
        let cmd = ControlCommand::play_walk("walk-danish", at())
            .with_category("languages")
            .with_intro(Some("wait-danish".to_string()))
            .with_outro(None)
            .with_audio("walk-danish");
        let value: serde_json::Value = serde_json::from_slice(&cmd.to_bytes().unwrap()).unwrap();

        assert_eq!(value["kind"], "play_walk");
        assert_eq!(value["target"], "all");
        assert_eq!(value["walk"], "walk-danish");
        assert_eq!(value["intro"], "wait-danish");
        assert!(value.get("outro").is_none());
        assert_eq!(value["issued_at"], "2025-07-01T09:00:00+00:00");

        let back = ControlCommand::from_bytes(&cmd.to_bytes().unwrap()).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn scope_includes() {
        assert!(TargetScope::All.includes(ComponentRole::Timer));
        assert!(TargetScope::Role(ComponentRole::Timer).includes(ComponentRole::Timer));
        assert!(!TargetScope::Role(ComponentRole::Timer).includes(ComponentRole::Api));
    }
}
