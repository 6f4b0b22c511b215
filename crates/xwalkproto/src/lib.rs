//! xwalkproto - Wire types for the crosswalk ZMQ message bus
//!
//! Every message on the bus is a single JSON frame. Stations publish
//! interactions and heartbeats to the controller's SUB sockets, the
//! controller broadcasts control commands on its PUB socket, and operator
//! tools talk to the controller's ROUTER socket with API requests.
//!
//! ```text
//!  stations ──PUB──► :5556 interactions ─┐
//!  stations ──PUB──► :5558 heartbeats ───┤
//!  xwalkctl ─DEALER► :5559 api ──────────┼──► controller
//!  stations ◄──SUB── :5557 control ◄─────┘
//! ```
//!
//! ## Lenient decoding
//!
//! Stations in the field are not all upgraded at once, so decoding accepts
//! a few older spellings: `type` for `kind`, `button_press` for `press`,
//! naive timestamps, and heartbeats without a role (inferred from the
//! component id). Anything else unknown is a [`DecodeError`].
//!
//! ## Peer feature
//!
//! The `peer` feature (on by default) adds tmq socket helpers, reconnect
//! backoff, the API client, and the station-side publisher.

pub mod api;
pub mod codec;
pub mod command;
pub mod heartbeat;
pub mod interaction;
pub mod status;
pub mod timestamp;

#[cfg(feature = "peer")]
pub mod backoff;
#[cfg(feature = "peer")]
pub mod client;
#[cfg(feature = "peer")]
pub mod publisher;
#[cfg(feature = "peer")]
pub mod socket_config;

pub use api::{ApiRequest, ApiRequestKind, ApiResponse};
pub use codec::{DecodeError, WireMessage};
pub use command::{CommandKind, ControlCommand, TargetScope};
pub use heartbeat::{ComponentRole, Heartbeat};
pub use interaction::{InteractionEvent, InteractionKind};
pub use status::{ComponentReport, ComponentStatus, ControllerState, LastSelection, StatusSnapshot};

#[cfg(feature = "peer")]
pub use backoff::BackoffConfig;
#[cfg(feature = "peer")]
pub use client::ApiClient;
#[cfg(feature = "peer")]
pub use publisher::StationPublisher;
