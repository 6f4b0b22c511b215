//! DEALER client for the controller API, following zguide's Lazy Pirate
//! pattern: ZMQ handles reconnection, the client retries on timeout.
//!
//! Replies are matched on `request_id`. A late reply to an earlier attempt
//! is discarded rather than handed to the wrong caller.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::backoff::BackoffConfig;
use crate::codec::WireMessage;
use crate::socket_config::{
    create_dealer_and_connect, frames_to_multipart, multipart_to_frames, Multipart, ZmqContext,
};
use crate::{ApiRequest, ApiResponse};

/// Client-side request settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Timeout per request attempt
    pub timeout: Duration,
    /// Attempts after the first one
    pub max_retries: u32,
    pub backoff: BackoffConfig,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
            backoff: BackoffConfig::default(),
        }
    }

    pub fn from_config(config: &xwalkconf::XwalkConfig) -> Self {
        let transport = &config.infra.transport;
        Self {
            endpoint: config.infra.connect.api.clone(),
            timeout: transport.request_timeout,
            max_retries: transport.request_retries,
            backoff: BackoffConfig::from_transport(transport),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

pub struct ApiClient {
    config: ClientConfig,
    _context: ZmqContext,
    tx: SplitSink<tmq::dealer::Dealer, Multipart>,
    rx: SplitStream<tmq::dealer::Dealer>,
}

impl ApiClient {
    /// Connect lazily; the controller does not need to be up yet.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let context = ZmqContext::new();
        let socket = create_dealer_and_connect(&context, &config.endpoint, "api-client")?;
        let (tx, rx) = socket.split();
        Ok(Self {
            config,
            _context: context,
            tx,
            rx,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Send a request, retrying on timeout with capped backoff.
    pub async fn request(&mut self, request: &ApiRequest) -> Result<ApiResponse> {
        let body = Bytes::from(request.to_bytes().context("Failed to encode API request")?);
        // Empty delimiter first, so REQ-style routers see the same framing.
        let frames = [Bytes::new(), body];

        for attempt in 0..=self.config.max_retries {
            let delay = self.config.backoff.backoff_for_attempt(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            self.tx
                .send(frames_to_multipart(&frames))
                .await
                .with_context(|| format!("Failed to send request to {}", self.config.endpoint))?;

            match tokio::time::timeout(self.config.timeout, self.await_reply(request)).await {
                Ok(result) => return result,
                Err(_) => {
                    warn!(
                        request_id = %request.request_id,
                        attempt = attempt + 1,
                        "API request timed out after {:?}",
                        self.config.timeout
                    );
                }
            }
        }

        bail!(
            "No reply from {} after {} attempts",
            self.config.endpoint,
            self.config.max_retries + 1
        )
    }

    async fn await_reply(&mut self, request: &ApiRequest) -> Result<ApiResponse> {
        loop {
            let mp = match self.rx.next().await {
                Some(Ok(mp)) => mp,
                Some(Err(e)) => return Err(e).context("Failed to receive API reply"),
                None => bail!("API socket closed"),
            };

            let frames = multipart_to_frames(mp);
            let Some(payload) = frames.last() else {
                continue;
            };

            match ApiResponse::from_bytes(payload) {
                Ok(response) if response.request_id == request.request_id => {
                    return Ok(response);
                }
                Ok(response) => {
                    debug!(
                        expected = %request.request_id,
                        got = %response.request_id,
                        "Discarding stale API reply"
                    );
                }
                Err(e) => {
                    warn!("Discarding undecodable API reply: {}", e);
                }
            }
        }
    }
}
