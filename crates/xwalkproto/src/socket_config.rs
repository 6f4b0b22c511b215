//! Centralized ZMQ socket configuration for crosswalk peers
//!
//! All socket setup goes through these helpers so the controller, stations
//! and xwalkctl share one set of options:
//!
//! - `LINGER` = 0 for clean shutdown
//! - `RECONNECT_IVL` = 1s for responsive reconnection
//! - `RECONNECT_IVL_MAX` = 60s to cap libzmq's own backoff

use anyhow::{Context, Result};
use bytes::Bytes;

pub use tmq::Multipart;

/// tmq context shared by every socket a peer opens.
pub type ZmqContext = tmq::Context;

/// Default reconnect interval in milliseconds
pub const DEFAULT_RECONNECT_IVL_MS: i32 = 1000;

/// Maximum reconnect interval in milliseconds (60 seconds)
pub const DEFAULT_RECONNECT_IVL_MAX_MS: i32 = 60_000;

/// Create a SUB socket, bind it, and subscribe to everything.
pub fn create_subscriber_and_bind(
    ctx: &ZmqContext,
    endpoint: &str,
    name: &str,
) -> Result<tmq::subscribe::Subscribe> {
    tmq::subscribe(ctx)
        .set_linger(0)
        .bind(endpoint)
        .with_context(|| format!("Failed to bind {} SUB socket to {}", name, endpoint))?
        .subscribe(b"")
        .with_context(|| format!("Failed to subscribe {} socket", name))
}

/// Create a SUB socket, connect it, and subscribe to everything.
pub fn create_subscriber_and_connect(
    ctx: &ZmqContext,
    endpoint: &str,
    name: &str,
) -> Result<tmq::subscribe::Subscribe> {
    tmq::subscribe(ctx)
        .set_linger(0)
        .set_reconnect_ivl(DEFAULT_RECONNECT_IVL_MS)
        .set_reconnect_ivl_max(DEFAULT_RECONNECT_IVL_MAX_MS)
        .connect(endpoint)
        .with_context(|| format!("Failed to connect {} SUB socket to {}", name, endpoint))?
        .subscribe(b"")
        .with_context(|| format!("Failed to subscribe {} socket", name))
}

pub fn create_publisher_and_bind(
    ctx: &ZmqContext,
    endpoint: &str,
    name: &str,
) -> Result<tmq::publish::Publish> {
    tmq::publish(ctx)
        .set_linger(0)
        .bind(endpoint)
        .with_context(|| format!("Failed to bind {} PUB socket to {}", name, endpoint))
}

pub fn create_publisher_and_connect(
    ctx: &ZmqContext,
    endpoint: &str,
    name: &str,
) -> Result<tmq::publish::Publish> {
    tmq::publish(ctx)
        .set_linger(0)
        .set_reconnect_ivl(DEFAULT_RECONNECT_IVL_MS)
        .set_reconnect_ivl_max(DEFAULT_RECONNECT_IVL_MAX_MS)
        .connect(endpoint)
        .with_context(|| format!("Failed to connect {} PUB socket to {}", name, endpoint))
}

pub fn create_router_and_bind(
    ctx: &ZmqContext,
    endpoint: &str,
    name: &str,
) -> Result<tmq::router::Router> {
    tmq::router(ctx)
        .set_linger(0)
        .bind(endpoint)
        .with_context(|| format!("Failed to bind {} ROUTER socket to {}", name, endpoint))
}

pub fn create_dealer_and_connect(
    ctx: &ZmqContext,
    endpoint: &str,
    name: &str,
) -> Result<tmq::dealer::Dealer> {
    tmq::dealer(ctx)
        .set_linger(0)
        .set_reconnect_ivl(DEFAULT_RECONNECT_IVL_MS)
        .set_reconnect_ivl_max(DEFAULT_RECONNECT_IVL_MAX_MS)
        .connect(endpoint)
        .with_context(|| format!("Failed to connect {} DEALER socket to {}", name, endpoint))
}

/// Convert tmq Multipart to Vec<Bytes> for frame processing
pub fn multipart_to_frames(mp: Multipart) -> Vec<Bytes> {
    mp.into_iter()
        .map(|msg| Bytes::from(msg.to_vec()))
        .collect()
}

/// Convert Vec<Bytes> frames to tmq Multipart
pub fn frames_to_multipart(frames: &[Bytes]) -> Multipart {
    frames
        .iter()
        .map(|f| f.to_vec())
        .collect::<Vec<_>>()
        .into()
}

/// Split a ROUTER frame set into its routing envelope and payload.
///
/// The envelope is everything up to and including the last empty delimiter
/// (REQ peers), or just the identity frame when there is no delimiter
/// (DEALER peers). The payload is the final frame. Returns `None` when there
/// is nothing after the envelope.
pub fn split_envelope(frames: &[Bytes]) -> Option<(Vec<Bytes>, Bytes)> {
    let (payload, rest) = frames.split_last()?;
    let envelope_len = match rest.iter().rposition(|f| f.is_empty()) {
        Some(delimiter) => delimiter + 1,
        None => 1,
    };
    if rest.len() < envelope_len {
        return None;
    }
    Some((rest[..envelope_len].to_vec(), payload.clone()))
}
