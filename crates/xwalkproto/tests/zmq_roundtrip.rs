//! Real tmq sockets on localhost: station PUB -> controller SUB, and the
//! API client against a ROUTER.

use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use xwalkproto::client::ClientConfig;
use xwalkproto::socket_config::{
    create_router_and_bind, create_subscriber_and_bind, frames_to_multipart,
    multipart_to_frames, split_envelope, ZmqContext,
};
use xwalkproto::{
    ApiClient, ApiRequest, ApiResponse, ComponentRole, Heartbeat, InteractionEvent,
    InteractionKind, StationPublisher, WireMessage,
};

static PORT: AtomicU16 = AtomicU16::new(17670);

fn next_endpoint() -> String {
    let port = PORT.fetch_add(1, Ordering::SeqCst);
    format!("tcp://127.0.0.1:{}", port)
}

#[tokio::test]
async fn test_station_publish_reaches_bound_subscriber() {
    let endpoint = next_endpoint();
    let ctx = ZmqContext::new();
    let mut sub = create_subscriber_and_bind(&ctx, &endpoint, "test-interactions").unwrap();

    let mut publisher = StationPublisher::connect(&endpoint, "crosswalk-test").unwrap();
    publisher.settle().await;
    publisher
        .interaction(InteractionKind::Press, "button_switch")
        .await
        .unwrap();

    let mp = tokio::time::timeout(Duration::from_secs(2), sub.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let frames = multipart_to_frames(mp);
    assert_eq!(frames.len(), 1);

    let event = InteractionEvent::from_bytes(&frames[0]).unwrap();
    assert_eq!(event.kind, InteractionKind::Press);
    assert_eq!(event.source, "button_switch");
    assert_eq!(event.host.as_deref(), Some("crosswalk-test"));
}

#[tokio::test]
async fn test_heartbeat_publish() {
    let endpoint = next_endpoint();
    let ctx = ZmqContext::new();
    let mut sub = create_subscriber_and_bind(&ctx, &endpoint, "test-heartbeats").unwrap();

    let mut publisher = StationPublisher::connect(&endpoint, "crosswalk-test").unwrap();
    publisher.settle().await;
    publisher
        .heartbeat("lights", Some(ComponentRole::ButtonLights), true)
        .await
        .unwrap();

    let mp = tokio::time::timeout(Duration::from_secs(2), sub.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let beat = Heartbeat::from_bytes(&multipart_to_frames(mp)[0]).unwrap();
    assert_eq!(beat.component, "lights");
    assert_eq!(beat.role(), ComponentRole::ButtonLights);
    assert!(beat.initial);
}

#[tokio::test]
async fn test_api_client_against_router() {
    let endpoint = next_endpoint();
    let ctx = ZmqContext::new();
    let router = create_router_and_bind(&ctx, &endpoint, "test-api").unwrap();
    let (mut router_tx, mut router_rx) = router.split();

    // Answer exactly one request, echoing its id.
    let server = tokio::spawn(async move {
        let mp = router_rx.next().await.unwrap().unwrap();
        let frames = multipart_to_frames(mp);
        let (envelope, payload) = split_envelope(&frames).unwrap();
        // identity + empty delimiter
        assert_eq!(envelope.len(), 2);

        let request = ApiRequest::from_bytes(&payload).unwrap();
        let response = ApiResponse::ok(request.request_id, "pong");

        let mut reply = envelope;
        reply.push(response.to_bytes().unwrap().into());
        router_tx.send(frames_to_multipart(&reply)).await.unwrap();
        request
    });

    let config = ClientConfig::new(&endpoint)
        .with_timeout(Duration::from_secs(2))
        .with_retries(0);
    let mut client = ApiClient::connect(config).unwrap();

    let request = ApiRequest::status_query();
    let response = client.request(&request).await.unwrap();

    assert!(response.success);
    assert_eq!(response.request_id, request.request_id);
    assert_eq!(response.message, "pong");

    let seen = server.await.unwrap();
    assert_eq!(seen, request);
}

#[tokio::test]
async fn test_api_client_gives_up_without_server() {
    let endpoint = next_endpoint();
    let config = ClientConfig::new(&endpoint)
        .with_timeout(Duration::from_millis(100))
        .with_retries(1);
    let mut client = ApiClient::connect(config).unwrap();

    let err = client.request(&ApiRequest::status_query()).await.unwrap_err();
    assert!(err.to_string().contains("after 2 attempts"));
}
