//! In-process event bus for tests and offline runs.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use xwalkproto::{ApiRequest, ApiResponse, ControlCommand, Heartbeat, InteractionEvent, WireMessage};

use super::{ApiCall, BusEvent, EventBus};
use crate::error::{Error, Result};

/// Controller side of an in-memory bus.
pub struct MemoryBus {
    events: mpsc::Receiver<BusEvent>,
    commands: mpsc::UnboundedSender<ControlCommand>,
}

/// Station / operator side: feeds events in and observes commands.
pub struct MemoryBusHandle {
    events: Option<mpsc::Sender<BusEvent>>,
    commands: mpsc::UnboundedReceiver<ControlCommand>,
}

impl MemoryBus {
    pub fn new(queue_depth: usize) -> (Self, MemoryBusHandle) {
        let (event_tx, event_rx) = mpsc::channel(queue_depth.max(1));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        (
            Self {
                events: event_rx,
                commands: command_tx,
            },
            MemoryBusHandle {
                events: Some(event_tx),
                commands: command_rx,
            },
        )
    }
}

#[async_trait::async_trait]
impl EventBus for MemoryBus {
    async fn recv(&mut self) -> Option<BusEvent> {
        self.events.recv().await
    }

    async fn publish(&mut self, command: &ControlCommand) -> Result<()> {
        self.commands
            .send(command.clone())
            .map_err(|_| Error::Transport("command receiver dropped".to_string()))
    }

    async fn close(&mut self) {
        self.events.close();
    }
}

fn encode<T: WireMessage>(message: &T) -> Result<Bytes> {
    message
        .to_bytes()
        .map(Bytes::from)
        .map_err(|e| Error::Transport(format!("failed to encode {}: {e}", T::KIND)))
}

impl MemoryBusHandle {
    pub async fn send(&self, event: BusEvent) -> Result<()> {
        let events = self
            .events
            .as_ref()
            .ok_or_else(|| Error::Transport("inbound side closed".to_string()))?;
        events
            .send(event)
            .await
            .map_err(|_| Error::Transport("controller stopped receiving".to_string()))
    }

    pub async fn interaction(&self, event: &InteractionEvent) -> Result<()> {
        self.send(BusEvent::Interaction(encode(event)?)).await
    }

    /// Send an interaction frame exactly as given, valid or not.
    pub async fn raw_interaction(&self, frame: impl Into<Bytes>) -> Result<()> {
        self.send(BusEvent::Interaction(frame.into())).await
    }

    pub async fn heartbeat(&self, beat: &Heartbeat) -> Result<()> {
        self.send(BusEvent::Heartbeat(encode(beat)?)).await
    }

    pub async fn api(&self, request: &ApiRequest) -> Result<oneshot::Receiver<ApiResponse>> {
        self.raw_api(encode(request)?).await
    }

    pub async fn raw_api(
        &self,
        frame: impl Into<Bytes>,
    ) -> Result<oneshot::Receiver<ApiResponse>> {
        let (call, response) = ApiCall::new(frame.into());
        self.send(BusEvent::Api(call)).await?;
        Ok(response)
    }

    /// Drop the inbound sender so the controller sees end-of-stream once
    /// the queue is drained.
    pub fn close_inbound(&mut self) {
        self.events = None;
    }

    /// Wait for the next published command.
    pub async fn command(&mut self) -> Option<ControlCommand> {
        self.commands.recv().await
    }

    pub fn try_command(&mut self) -> Option<ControlCommand> {
        self.commands.try_recv().ok()
    }

    /// Every command published so far that has not been taken yet.
    pub fn drain_commands(&mut self) -> Vec<ControlCommand> {
        std::iter::from_fn(|| self.commands.try_recv().ok()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use xwalkproto::InteractionKind;

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (mut bus, handle) = MemoryBus::new(8);
        handle
            .interaction(&InteractionEvent::new(InteractionKind::Press, "button_switch"))
            .await
            .unwrap();
        handle.heartbeat(&Heartbeat::new("timer")).await.unwrap();

        assert!(matches!(bus.recv().await, Some(BusEvent::Interaction(_))));
        assert!(matches!(bus.recv().await, Some(BusEvent::Heartbeat(_))));
    }

    #[tokio::test]
    async fn close_inbound_ends_stream() {
        let (mut bus, mut handle) = MemoryBus::new(8);
        handle.raw_interaction(&b"{}"[..]).await.unwrap();
        handle.close_inbound();

        assert!(bus.recv().await.is_some());
        assert!(bus.recv().await.is_none());
        assert!(handle.raw_interaction(&b"{}"[..]).await.is_err());
    }

    #[tokio::test]
    async fn published_commands_reach_handle() {
        let (mut bus, mut handle) = MemoryBus::new(8);
        bus.publish(&ControlCommand::reset(Utc::now())).await.unwrap();
        bus.publish(&ControlCommand::idle(Utc::now())).await.unwrap();

        assert_eq!(handle.drain_commands().len(), 2);
        assert!(handle.try_command().is_none());

        drop(handle);
        assert!(bus.publish(&ControlCommand::idle(Utc::now())).await.is_err());
    }
}
