use thiserror::Error;
use xwalkproto::DecodeError;

/// Controller errors.
///
/// `Config` is fatal at startup. Everything else is contained to the event
/// being processed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("unknown {kind}: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("no eligible walk")]
    Exhausted,

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    MalformedEvent(#[from] DecodeError),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn walk_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "walk",
            id: id.into(),
        }
    }

    /// Short stable name, used as a metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::NotFound { .. } => "not_found",
            Error::Exhausted => "exhausted",
            Error::Transport(_) => "transport",
            Error::MalformedEvent(_) => "malformed_event",
        }
    }

    pub fn category_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "category",
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
