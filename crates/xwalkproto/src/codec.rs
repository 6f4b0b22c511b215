//! JSON encode/decode for bus messages.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// An inbound frame that could not be turned into a message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty {kind} frame")]
    Empty { kind: &'static str },

    #[error("malformed {kind}: {source}")]
    Json {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Which message type was being decoded.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::Empty { kind } | DecodeError::Json { kind, .. } => kind,
        }
    }
}

/// A message that travels as one JSON frame.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Short name used in logs and decode errors.
    const KIND: &'static str;

    fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(DecodeError::Empty { kind: Self::KIND });
        }
        serde_json::from_slice(bytes).map_err(|source| DecodeError::Json {
            kind: Self::KIND,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InteractionEvent, InteractionKind};

    #[test]
    fn empty_frame_is_rejected() {
        let err = InteractionEvent::from_bytes(b"  ").unwrap_err();
        assert!(matches!(err, DecodeError::Empty { kind: "interaction" }));
    }

    #[test]
    fn garbage_reports_kind() {
        let err = InteractionEvent::from_bytes(b"{not json").unwrap_err();
        assert_eq!(err.kind(), "interaction");
        assert!(err.to_string().starts_with("malformed interaction"));
    }

    #[test]
    fn encode_is_plain_json() {
        let event = InteractionEvent::new(InteractionKind::Press, "button_switch");
        let bytes = event.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["kind"], "press");
        assert_eq!(value["source"], "button_switch");
    }
}
