//! Interaction events published by stations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::WireMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Button press edge.
    #[serde(alias = "button_press")]
    Press,
    #[serde(alias = "button_release")]
    Release,
    /// Station-local timer ran out.
    TimerExpired,
    SchedulerTick,
}

impl InteractionKind {
    /// Whether this kind of event asks the controller for a new walk.
    pub fn is_trigger(self) -> bool {
        !matches!(self, InteractionKind::Release)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::Press => "press",
            InteractionKind::Release => "release",
            InteractionKind::TimerExpired => "timer_expired",
            InteractionKind::SchedulerTick => "scheduler_tick",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    #[serde(alias = "type")]
    pub kind: InteractionKind,

    /// Component id of the sender.
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(
        default,
        with = "crate::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub sent_at: Option<DateTime<Utc>>,
}

impl InteractionEvent {
    pub fn new(kind: InteractionKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            host: None,
            sent_at: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn sent_at(mut self, at: DateTime<Utc>) -> Self {
        self.sent_at = Some(at);
        self
    }
}

impl WireMessage for InteractionEvent {
    const KIND: &'static str = "interaction";
}
