//! Integration tests for the HTTP transport.
//!
//! Exercises real HTTP exchanges against a mock collector: response
//! classification, admission control, connection failures and shutdown
//! draining.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::time::{Duration, Instant};

use courier_core::{DeliveryError, Status};
use courier_testing::{
    sample_event, unreachable_destination, CollectorResponse, EventBuilder, MockCollector,
};
use courier_transport::{HttpTransport, Transport, TransportOptions};

fn transport_for(collector: &MockCollector, capacity: usize) -> HttpTransport {
    let options = TransportOptions::new(collector.destination()).with_buffer_capacity(capacity);
    HttpTransport::new(options).expect("transport should build")
}

#[tokio::test]
async fn accepted_event_resolves_with_success() {
    let collector = MockCollector::start().await;
    collector.expect(CollectorResponse::ok(), 1).await;
    let transport = transport_for(&collector, 30);

    let response = transport
        .send(sample_event())
        .expect("delivery should be admitted")
        .await
        .expect("delivery should succeed");

    assert_eq!(response.status, Status::Success);
    assert!(transport.buffer().is_empty());
}

#[tokio::test]
async fn rate_limited_event_fails_with_collector_reason() {
    let collector = MockCollector::start().await;
    collector.respond_with(CollectorResponse::rejected(429, "rate limited")).await;
    let transport = transport_for(&collector, 30);

    let result = transport.send(sample_event()).unwrap().await;

    match result {
        Err(error @ DeliveryError::RemoteError { .. }) => {
            assert_eq!(error, DeliveryError::remote(429, "rate limited"));
            assert_eq!(error.status(), Some(Status::RateLimited));
        },
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn rejection_without_reason_header_has_empty_reason() {
    let collector = MockCollector::start().await;
    collector.respond_with(CollectorResponse::Rejected { status: 500, reason: None }).await;
    let transport = transport_for(&collector, 30);

    let result = transport.send(sample_event()).unwrap().await;

    assert_eq!(result, Err(DeliveryError::remote(500, "")));
}

#[tokio::test]
async fn request_carries_json_body_and_sdk_headers() {
    let collector = MockCollector::start().await;
    collector.respond_with(CollectorResponse::ok()).await;
    let options = TransportOptions::new(collector.destination()).with_header("x-team", "payments");
    let transport = HttpTransport::new(options).unwrap();

    let event = EventBuilder::new().message("disk full").level("fatal").build();
    transport.send(event.clone()).unwrap().await.unwrap();

    let requests = collector.received_requests().await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(&body, event.payload());
    assert_eq!(request.headers["content-type"], "application/json");
    assert_eq!(request.headers["x-team"], "payments");
    let auth = request.headers["x-sentry-auth"].to_str().unwrap();
    assert!(auth.contains("sentry_key=test-public-key"));
}

#[tokio::test]
async fn admission_beyond_capacity_is_rejected_without_network_call() {
    let collector = MockCollector::start().await;
    collector
        .expect(CollectorResponse::Delayed { status: 200, delay: Duration::from_millis(300) }, 2)
        .await;
    let transport = transport_for(&collector, 2);

    let first = transport.send(sample_event()).expect("first delivery admitted");
    let second = transport.send(sample_event()).expect("second delivery admitted");
    let third = transport.send(sample_event());

    assert!(matches!(third, Err(DeliveryError::BufferFull { capacity: 2 })));
    assert_eq!(transport.buffer().in_flight(), 2);

    assert_eq!(first.await.unwrap().status, Status::Success);
    assert_eq!(second.await.unwrap().status, Status::Success);
    assert_eq!(collector.received_count().await, 2);
}

#[tokio::test]
async fn connection_refused_fails_with_transport_error_and_frees_slot() {
    let transport =
        HttpTransport::new(TransportOptions::new(unreachable_destination()).with_buffer_capacity(1))
            .unwrap();

    let result = transport.send(sample_event()).unwrap().await;

    match result {
        Err(DeliveryError::TransportError { cause }) => {
            assert!(!cause.is_empty());
        },
        other => panic!("expected transport error, got {other:?}"),
    }
    assert!(transport.buffer().is_empty());

    let retry = transport.send(sample_event());
    assert!(retry.is_ok(), "slot should be free after a transport failure");
    retry.unwrap().await.unwrap_err();
}

#[tokio::test]
async fn close_returns_promptly_once_in_flight_delivery_settles() {
    let collector = MockCollector::start().await;
    collector
        .respond_with(CollectorResponse::Delayed { status: 200, delay: Duration::from_millis(100) })
        .await;
    let transport = transport_for(&collector, 30);

    let handle = transport.send(sample_event()).unwrap();

    let start = Instant::now();
    assert!(transport.close(Some(Duration::from_millis(5_000))).await);
    assert!(start.elapsed() < Duration::from_secs(2), "close waited for the full timeout");
    assert_eq!(handle.await.unwrap().status, Status::Success);
}

#[tokio::test]
async fn close_times_out_without_aborting_delivery() {
    let collector = MockCollector::start().await;
    collector
        .respond_with(CollectorResponse::Delayed { status: 200, delay: Duration::from_millis(500) })
        .await;
    let transport = transport_for(&collector, 30);

    let handle = transport.send(sample_event()).unwrap();

    assert!(!transport.close(Some(Duration::ZERO)).await);
    assert!(!transport.close(Some(Duration::from_millis(50))).await);

    assert_eq!(handle.await.unwrap().status, Status::Success);
    assert!(transport.close(Some(Duration::ZERO)).await);
}

#[tokio::test]
async fn close_on_idle_transport_is_immediate() {
    let collector = MockCollector::start().await;
    let transport = transport_for(&collector, 30);

    assert!(transport.close(Some(Duration::ZERO)).await);
    assert!(transport.close(None).await);
}

#[tokio::test]
async fn dropped_handles_still_deliver() {
    let collector = MockCollector::start().await;
    collector.expect(CollectorResponse::ok(), 5).await;
    let transport = transport_for(&collector, 30);

    for _ in 0..5 {
        drop(transport.send(sample_event()).unwrap());
    }

    assert!(transport.close(Some(Duration::from_secs(5))).await);
    assert_eq!(collector.received_count().await, 5);
}

#[tokio::test]
async fn shared_client_is_used_for_every_delivery() {
    let collector = MockCollector::start().await;
    collector.expect(CollectorResponse::ok(), 3).await;
    let client = reqwest::Client::builder().pool_max_idle_per_host(1).build().unwrap();
    let options = TransportOptions::new(collector.destination()).with_client(client);
    let transport = HttpTransport::new(options).unwrap();

    for _ in 0..3 {
        transport.send(sample_event()).unwrap().await.unwrap();
    }
}
