//! Operator API requests and responses (ROUTER on the controller side).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::WireMessage;
use crate::command::ControlCommand;
use crate::status::StatusSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiRequestKind {
    StatusQuery,
    /// Run a selection as if a button had been pressed, or play `walk`.
    ManualTrigger,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub request_id: Uuid,
    pub kind: ApiRequestKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walk: Option<String>,
}

impl ApiRequest {
    fn new(kind: ApiRequestKind) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            kind,
            walk: None,
        }
    }

    pub fn status_query() -> Self {
        Self::new(ApiRequestKind::StatusQuery)
    }

    pub fn manual_trigger(walk: Option<String>) -> Self {
        Self {
            walk,
            ..Self::new(ApiRequestKind::ManualTrigger)
        }
    }

    pub fn reset() -> Self {
        Self::new(ApiRequestKind::Reset)
    }
}

impl WireMessage for ApiRequest {
    const KIND: &'static str = "api request";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Echo of the request id; nil when the request could not be decoded.
    pub request_id: Uuid,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusSnapshot>,
    /// The command published on behalf of the request, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<ControlCommand>,
}

impl ApiResponse {
    pub fn ok(request_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            request_id,
            success: true,
            message: message.into(),
            status: None,
            command: None,
        }
    }

    pub fn error(request_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(request_id, message)
        }
    }

    pub fn with_status(mut self, status: StatusSnapshot) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_command(mut self, command: ControlCommand) -> Self {
        self.command = Some(command);
        self
    }
}

impl WireMessage for ApiResponse {
    const KIND: &'static str = "api response";
}
