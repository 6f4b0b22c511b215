//! Station-side publisher: interactions and heartbeats toward the controller.
//!
//! Stations connect a PUB socket to the controller's bound SUB socket. PUB
//! drops anything sent before the connection completes, so callers that send
//! immediately after `connect` should wait for [`StationPublisher::settle`].

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::SinkExt;
use tracing::debug;

use crate::codec::WireMessage;
use crate::socket_config::{create_publisher_and_connect, Multipart, ZmqContext};
use crate::{ComponentRole, Heartbeat, InteractionEvent, InteractionKind};

/// Time given to a fresh PUB connection before the first send.
pub const SETTLE_DELAY: Duration = Duration::from_millis(250);

pub struct StationPublisher {
    _context: ZmqContext,
    socket: tmq::publish::Publish,
    endpoint: String,
    hostname: String,
}

impl StationPublisher {
    pub fn connect(endpoint: &str, hostname: impl Into<String>) -> Result<Self> {
        let context = ZmqContext::new();
        let socket = create_publisher_and_connect(&context, endpoint, "station")?;
        Ok(Self {
            _context: context,
            socket,
            endpoint: endpoint.to_string(),
            hostname: hostname.into(),
        })
    }

    /// Wait out the PUB/SUB join so the first message is not lost.
    pub async fn settle(&self) {
        tokio::time::sleep(SETTLE_DELAY).await;
    }

    pub async fn send<T: WireMessage>(&mut self, message: &T) -> Result<()> {
        let body = message
            .to_bytes()
            .with_context(|| format!("Failed to encode {}", T::KIND))?;
        let mp: Multipart = vec![body].into();
        self.socket
            .send(mp)
            .await
            .with_context(|| format!("Failed to publish {} to {}", T::KIND, self.endpoint))?;
        debug!(kind = T::KIND, endpoint = %self.endpoint, "Published");
        Ok(())
    }

    pub async fn interaction(&mut self, kind: InteractionKind, source: &str) -> Result<()> {
        let event = InteractionEvent::new(kind, source)
            .with_host(self.hostname.clone())
            .sent_at(Utc::now());
        self.send(&event).await
    }

    pub async fn heartbeat(
        &mut self,
        component: &str,
        role: Option<ComponentRole>,
        initial: bool,
    ) -> Result<()> {
        let mut beat = Heartbeat::new(component)
            .with_host(self.hostname.clone())
            .initial(initial)
            .sent_at(Utc::now());
        beat.role = role;
        self.send(&beat).await
    }
}
