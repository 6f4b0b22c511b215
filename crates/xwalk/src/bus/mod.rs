//! Event bus adapter.
//!
//! Inbound interactions, heartbeats and API requests arrive from concurrent
//! transport workers and are funnelled into one ordered queue; the
//! controller drains it with [`EventBus::recv`]. Control commands go out
//! fire-and-forget on [`EventBus::publish`].

pub mod memory;
pub mod zmq_bus;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::debug;

use xwalkproto::{ApiResponse, ControlCommand};

use crate::error::Result;

pub use memory::{MemoryBus, MemoryBusHandle};
pub use zmq_bus::ZmqBus;

/// One inbound event. Payloads stay raw until the controller decodes them,
/// so a malformed frame is handled at the sequencing point like any other.
#[derive(Debug)]
pub enum BusEvent {
    Interaction(Bytes),
    Heartbeat(Bytes),
    Api(ApiCall),
}

/// An API request and the channel its reply goes back on.
#[derive(Debug)]
pub struct ApiCall {
    pub payload: Bytes,
    reply: oneshot::Sender<ApiResponse>,
}

impl ApiCall {
    pub fn new(payload: Bytes) -> (Self, oneshot::Receiver<ApiResponse>) {
        let (reply, rx) = oneshot::channel();
        (Self { payload, reply }, rx)
    }

    /// Send the reply. A requester that has gone away is not an error.
    pub fn respond(self, response: ApiResponse) {
        if self.reply.send(response).is_err() {
            debug!("API requester went away before the reply");
        }
    }
}

#[async_trait]
pub trait EventBus: Send {
    /// Next inbound event, or `None` once every inbound source has closed.
    async fn recv(&mut self) -> Option<BusEvent>;

    /// Broadcast a control command to every subscribed station.
    async fn publish(&mut self, command: &ControlCommand) -> Result<()>;

    /// Stop transport workers and release sockets.
    async fn close(&mut self);
}
