//! ZMQ implementation of the event bus.
//!
//! The controller binds every socket; stations connect to it:
//! - SUB (interactions), SUB (heartbeats): one worker task each
//! - ROUTER (api): one worker task; replies go back with the request's envelope
//! - PUB (control): owned by the bus and written from the controller loop
//!
//! Workers never touch controller state. They push raw frames into a single
//! bounded queue, which is the only synchronization point.

use std::time::Duration;

use anyhow::Context as _;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use xwalkconf::XwalkConfig;
use xwalkproto::socket_config::{
    create_publisher_and_bind, create_router_and_bind, create_subscriber_and_bind,
    frames_to_multipart, multipart_to_frames, split_envelope, Multipart, ZmqContext,
};
use xwalkproto::{BackoffConfig, ControlCommand, WireMessage};

use super::{ApiCall, BusEvent, EventBus};
use crate::error::{Error, Result};

/// Which inbound SUB channel a worker serves.
#[derive(Debug, Clone, Copy)]
enum Inbound {
    Interactions,
    Heartbeats,
}

impl Inbound {
    fn name(self) -> &'static str {
        match self {
            Inbound::Interactions => "interactions",
            Inbound::Heartbeats => "heartbeats",
        }
    }

    fn event(self, payload: Bytes) -> BusEvent {
        match self {
            Inbound::Interactions => BusEvent::Interaction(payload),
            Inbound::Heartbeats => BusEvent::Heartbeat(payload),
        }
    }
}

pub struct ZmqBus {
    context: ZmqContext,
    events: mpsc::Receiver<BusEvent>,
    publisher: Option<tmq::publish::Publish>,
    control_endpoint: String,
    send_timeout: Duration,
    backoff: BackoffConfig,
    publish_failures: u32,
    next_rebind: Option<Instant>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ZmqBus {
    /// Bind all four sockets and start the inbound workers.
    ///
    /// Bind failures here are returned to the caller: a controller that
    /// cannot listen has nothing useful to do.
    pub fn bind(config: &XwalkConfig) -> anyhow::Result<Self> {
        let bind = &config.infra.bind;
        let transport = &config.infra.transport;
        let backoff = BackoffConfig::from_transport(transport);
        let cancel = CancellationToken::new();
        let (tx, events) = mpsc::channel(transport.queue_depth.max(1));

        let (major, minor, patch) = zmq::version();
        debug!("Using libzmq {}.{}.{}", major, minor, patch);

        let mut tasks = Vec::with_capacity(3);
        for (inbound, endpoint) in [
            (Inbound::Interactions, &bind.interactions),
            (Inbound::Heartbeats, &bind.heartbeats),
        ] {
            let context = ZmqContext::new();
            let socket = create_subscriber_and_bind(&context, endpoint, inbound.name())?;
            info!(channel = inbound.name(), "Listening on {}", endpoint);
            tasks.push(tokio::spawn(subscriber_worker(
                context,
                socket,
                inbound,
                endpoint.clone(),
                tx.clone(),
                backoff.clone(),
                cancel.clone(),
            )));
        }

        let api_context = ZmqContext::new();
        let router = create_router_and_bind(&api_context, &bind.api, "api")?;
        info!(channel = "api", "Listening on {}", bind.api);
        tasks.push(tokio::spawn(api_worker(
            api_context,
            router,
            bind.api.clone(),
            tx,
            backoff.clone(),
            cancel.clone(),
        )));

        let context = ZmqContext::new();
        let publisher = create_publisher_and_bind(&context, &bind.control, "control")
            .context("Control channel unavailable")?;
        info!(channel = "control", "Publishing on {}", bind.control);

        Ok(Self {
            context,
            events,
            publisher: Some(publisher),
            control_endpoint: bind.control.clone(),
            send_timeout: transport.send_timeout,
            backoff,
            publish_failures: 0,
            next_rebind: None,
            cancel,
            tasks,
        })
    }

    /// Re-bind the control PUB socket if the backoff window has passed.
    /// Never sleeps; a publish during the window fails fast.
    fn ensure_publisher(&mut self) -> Result<&mut tmq::publish::Publish> {
        if self.publisher.is_none() {
            if let Some(at) = self.next_rebind {
                if Instant::now() < at {
                    return Err(Error::Transport(format!(
                        "control socket {} is down, next re-bind in {:?}",
                        self.control_endpoint,
                        at - Instant::now()
                    )));
                }
            }

            match create_publisher_and_bind(&self.context, &self.control_endpoint, "control") {
                Ok(socket) => {
                    info!(attempt = self.publish_failures, "Re-bound control socket on {}", self.control_endpoint);
                    self.publisher = Some(socket);
                    self.next_rebind = None;
                }
                Err(e) => {
                    self.schedule_rebind();
                    return Err(Error::Transport(format!("{e:#}")));
                }
            }
        }

        self.publisher
            .as_mut()
            .ok_or_else(|| Error::Transport("control socket unavailable".to_string()))
    }

    fn schedule_rebind(&mut self) {
        self.publish_failures = self.publish_failures.saturating_add(1);
        let delay = self.backoff.backoff_for_attempt(self.publish_failures);
        self.next_rebind = Some(Instant::now() + delay);
    }
}

#[async_trait::async_trait]
impl EventBus for ZmqBus {
    async fn recv(&mut self) -> Option<BusEvent> {
        self.events.recv().await
    }

    async fn publish(&mut self, command: &ControlCommand) -> Result<()> {
        let body = command
            .to_bytes()
            .map_err(|e| Error::Transport(format!("failed to encode control command: {e}")))?;
        let send_timeout = self.send_timeout;
        let socket = self.ensure_publisher()?;
        let mp: Multipart = vec![body].into();

        match tokio::time::timeout(send_timeout, socket.send(mp)).await {
            Ok(Ok(())) => {
                self.publish_failures = 0;
                Ok(())
            }
            Ok(Err(e)) => {
                // drop the socket; the next publish re-binds after backoff
                self.publisher = None;
                self.schedule_rebind();
                Err(Error::Transport(format!("control publish failed: {e}")))
            }
            Err(_) => Err(Error::Transport(format!(
                "control publish timed out after {:?}",
                send_timeout
            ))),
        }
    }

    async fn close(&mut self) {
        self.cancel.cancel();
        for handle in self.tasks.drain(..) {
            if let Err(e) = handle.await {
                error!("Bus worker ended abnormally: {}", e);
            }
        }
        self.publisher = None;
        self.events.close();
        debug!("ZMQ bus closed");
    }
}

/// Re-bind after the socket failed, waiting out the backoff between tries.
/// Returns `None` if shutdown was requested meanwhile.
async fn rebind<S, F>(
    name: &str,
    endpoint: &str,
    backoff: &BackoffConfig,
    cancel: &CancellationToken,
    mut open: F,
) -> Option<S>
where
    F: FnMut() -> anyhow::Result<S>,
{
    let mut attempt = 1;
    loop {
        let delay = backoff.backoff_for_attempt(attempt);
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }
        match open() {
            Ok(socket) => {
                info!(channel = name, attempt, "Re-bound {}", endpoint);
                return Some(socket);
            }
            Err(e) => {
                warn!(channel = name, attempt, "Re-bind failed: {:#}", e);
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

async fn subscriber_worker(
    context: ZmqContext,
    mut socket: tmq::subscribe::Subscribe,
    inbound: Inbound,
    endpoint: String,
    tx: mpsc::Sender<BusEvent>,
    backoff: BackoffConfig,
    cancel: CancellationToken,
) {
    let name = inbound.name();
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = socket.next() => next,
        };

        match next {
            Some(Ok(mp)) => {
                // single-frame messages; anything in front of the last frame is ignored
                let Some(payload) = multipart_to_frames(mp).pop() else {
                    continue;
                };
                if tx.send(inbound.event(payload)).await.is_err() {
                    debug!(channel = name, "Event queue closed, stopping worker");
                    return;
                }
            }
            Some(Err(e)) => {
                warn!(channel = name, "Receive failed: {}", e);
                drop(socket);
                match rebind(name, &endpoint, &backoff, &cancel, || {
                    create_subscriber_and_bind(&context, &endpoint, name)
                })
                .await
                {
                    Some(fresh) => socket = fresh,
                    None => return,
                }
            }
            None => {
                warn!(channel = name, "SUB stream ended");
                drop(socket);
                match rebind(name, &endpoint, &backoff, &cancel, || {
                    create_subscriber_and_bind(&context, &endpoint, name)
                })
                .await
                {
                    Some(fresh) => socket = fresh,
                    None => return,
                }
            }
        }
    }
}

enum ApiStep {
    Stop,
    Reply(Multipart),
    Inbound(Option<tmq::Result<Multipart>>),
}

async fn api_worker(
    context: ZmqContext,
    socket: tmq::router::Router,
    endpoint: String,
    tx: mpsc::Sender<BusEvent>,
    backoff: BackoffConfig,
    cancel: CancellationToken,
) {
    let (mut router_tx, mut router_rx) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<Multipart>(256);

    loop {
        let step = tokio::select! {
            _ = cancel.cancelled() => ApiStep::Stop,
            Some(reply) = reply_rx.recv() => ApiStep::Reply(reply),
            next = router_rx.next() => ApiStep::Inbound(next),
        };

        match step {
            ApiStep::Stop => return,
            ApiStep::Reply(reply) => {
                if let Err(e) = router_tx.send(reply).await {
                    warn!(channel = "api", "Failed to send reply: {}", e);
                }
            }
            ApiStep::Inbound(Some(Ok(mp))) => {
                let frames = multipart_to_frames(mp);
                let Some((envelope, payload)) = split_envelope(&frames) else {
                    warn!(channel = "api", frames = frames.len(), "Dropping request without routing envelope");
                    continue;
                };

                let (call, response) = ApiCall::new(payload);
                if tx.send(BusEvent::Api(call)).await.is_err() {
                    debug!(channel = "api", "Event queue closed, stopping worker");
                    return;
                }

                let reply_tx = reply_tx.clone();
                tokio::spawn(async move {
                    let Ok(response) = response.await else {
                        debug!("API request dropped without a reply");
                        return;
                    };
                    match response.to_bytes() {
                        Ok(body) => {
                            let mut out = envelope;
                            out.push(Bytes::from(body));
                            if reply_tx.send(frames_to_multipart(&out)).await.is_err() {
                                debug!("API worker gone before reply was queued");
                            }
                        }
                        Err(e) => error!("Failed to encode API response: {}", e),
                    }
                });
            }
            ApiStep::Inbound(failure) => {
                match failure {
                    Some(Err(e)) => warn!(channel = "api", "Receive failed: {}", e),
                    _ => warn!(channel = "api", "ROUTER stream ended"),
                }
                drop(router_tx);
                drop(router_rx);
                let fresh = rebind("api", &endpoint, &backoff, &cancel, || {
                    create_router_and_bind(&context, &endpoint, "api")
                })
                .await;
                match fresh {
                    Some(socket) => (router_tx, router_rx) = socket.split(),
                    None => return,
                }
            }
        }
    }
}
