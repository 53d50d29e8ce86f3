// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Publish Loop Integration Tests
//!
//! - `test_pipeline_*`: outstanding Publish bound
//! - `test_acknowledgements_*`: piggy-backing and loss on failure
//! - `test_failure_*`: re-arm rules after a failed Publish
//! - `test_shutdown_*`: the loop stops with the manager

use std::sync::Arc;
use std::time::{Duration, Instant};

use uasub_client::messages::{
    NotificationMessage, PublishResponse, RequestMessage, SubscriptionAcknowledgement,
};
use uasub_client::{ClientConfig, StatusCode, TransportError, UaError};

use uasub_tests::common::{
    init_test_logging, settle, wait_until, ConfigFixtures, MockTransport, NotificationFixtures,
    TestClient,
};

fn connection_lost() -> UaError {
    UaError::transport(TransportError::send_failed("connection reset by mock"))
}

/// Keep-alive announcing sequence number 1 as the next to be used.
fn keep_alive(subscription_id: u32) -> PublishResponse {
    NotificationFixtures::publish(subscription_id, NotificationMessage::keep_alive(1))
}

// =============================================================================
// Pipeline bound
// =============================================================================

#[tokio::test]
async fn test_pipeline_idle_without_subscriptions() {
    init_test_logging();
    let test = TestClient::connect().await;

    settle().await;

    assert_eq!(test.manager().max_pending(), 0);
    assert_eq!(test.manager().in_flight(), 0);
    assert!(test.transport.max_outstanding_publishes() <= 1);
    assert_eq!(test.transport.request_count("Publish"), 0);
}

#[tokio::test]
async fn test_pipeline_two_per_subscription() {
    init_test_logging();
    let test = TestClient::connect().await;

    test.subscription().await;
    test.wait_for_publishes(2).await;
    settle().await;
    assert_eq!(test.transport.outstanding_publishes(), 2);
    assert_eq!(test.manager().in_flight(), 2);

    test.subscription().await;
    test.wait_for_publishes(4).await;
    settle().await;
    assert_eq!(test.transport.outstanding_publishes(), 4);
    assert_eq!(test.transport.max_outstanding_publishes(), 4);
    assert_eq!(test.manager().max_pending(), 4);
}

#[tokio::test]
async fn test_pipeline_depth_configurable() {
    init_test_logging();
    let test =
        TestClient::connect_with(MockTransport::new(), ConfigFixtures::with_pipeline_depth(3))
            .await;

    test.subscription().await;
    test.wait_for_publishes(3).await;
    settle().await;

    assert_eq!(test.transport.outstanding_publishes(), 3);
    assert_eq!(test.transport.max_outstanding_publishes(), 3);
}

#[tokio::test]
async fn test_pipeline_rearmed_after_response() {
    init_test_logging();
    let test = TestClient::connect().await;
    let subscription = test.subscription().await;
    let id = subscription.subscription_id();
    test.wait_for_publishes(2).await;

    for _ in 0..5 {
        assert!(test.transport.respond_publish(keep_alive(id)));
        test.wait_for_publishes(2).await;
    }
    settle().await;

    assert_eq!(test.transport.request_count("Publish"), 7);
    assert_eq!(test.transport.outstanding_publishes(), 2);
    assert_eq!(test.transport.max_outstanding_publishes(), 2);
    assert_eq!(test.manager().stats().publish_responses(), 5);
}

#[tokio::test]
async fn test_pipeline_shrinks_after_delete() {
    init_test_logging();
    let test = TestClient::connect().await;
    let kept = test.subscription().await;
    let deleted = test.subscription().await;
    test.wait_for_publishes(4).await;

    test.manager().delete_subscription(&deleted).await.unwrap();
    assert_eq!(test.manager().max_pending(), 2);

    // In flight drops 4 -> 3 -> 2 without re-arming, then 1 -> 2.
    for _ in 0..3 {
        assert!(test.transport.respond_publish(keep_alive(kept.subscription_id())));
        settle().await;
    }

    assert_eq!(test.transport.outstanding_publishes(), 2);
    assert_eq!(test.manager().in_flight(), 2);
    assert_eq!(test.transport.request_count("Publish"), 5);
}

#[tokio::test]
async fn test_pipeline_timeout_hint_covers_keep_alive() {
    init_test_logging();
    let test = TestClient::connect().await;

    // 1000 ms interval, keep-alive count 10, two pipelined requests.
    test.subscription().await;
    test.wait_for_publishes(2).await;

    let hints: Vec<u32> = test
        .transport
        .requests()
        .into_iter()
        .filter_map(|request| match request {
            RequestMessage::Publish(request) => Some(request.request_header.timeout_hint),
            _ => None,
        })
        .collect();
    assert_eq!(hints, vec![25_000, 25_000]);
}

// =============================================================================
// Acknowledgements
// =============================================================================

#[tokio::test]
async fn test_acknowledgements_carried_by_next_publish() {
    init_test_logging();
    let test =
        TestClient::connect_with(MockTransport::new(), ConfigFixtures::with_pipeline_depth(1))
            .await;
    let first = test.subscription().await;
    let second = test.subscription().await;
    test.wait_for_publishes(2).await;

    // Both answers land before the processing queue runs, so both
    // re-armed requests leave empty-handed.
    assert!(test.transport.respond_publish(NotificationFixtures::publish(
        first.subscription_id(),
        NotificationFixtures::status_change(1, StatusCode::GOOD),
    )));
    assert!(test.transport.respond_publish(NotificationFixtures::publish(
        second.subscription_id(),
        NotificationFixtures::status_change(1, StatusCode::GOOD),
    )));

    let manager = Arc::clone(test.manager());
    wait_until("both acknowledgements are pending", move || {
        manager.pending_acknowledgements() == 2
    })
    .await;
    test.wait_for_publishes(2).await;

    assert!(test.transport.fail_publish(connection_lost()));
    let transport = Arc::clone(&test.transport);
    wait_until("a publish carries the acknowledgements", move || {
        transport.publish_acknowledgements().len() == 5
    })
    .await;

    let carried = test.transport.publish_acknowledgements();
    assert_eq!(
        carried[4],
        vec![
            SubscriptionAcknowledgement::new(first.subscription_id(), 1),
            SubscriptionAcknowledgement::new(second.subscription_id(), 1),
        ]
    );
    assert_eq!(test.manager().pending_acknowledgements(), 0);
    assert_eq!(test.manager().stats().acknowledgements_sent(), 2);
}

#[tokio::test]
async fn test_acknowledgements_dropped_with_failed_publish() {
    init_test_logging();
    let test =
        TestClient::connect_with(MockTransport::new(), ConfigFixtures::with_pipeline_depth(1))
            .await;
    let subscription = test.subscription().await;
    let id = subscription.subscription_id();
    test.wait_for_publishes(1).await;

    assert!(test.transport.respond_publish(NotificationFixtures::publish(
        id,
        NotificationFixtures::status_change(1, StatusCode::GOOD),
    )));
    let manager = Arc::clone(test.manager());
    wait_until("the acknowledgement is pending", move || {
        manager.pending_acknowledgements() == 1
    })
    .await;
    test.wait_for_publishes(1).await;

    // The empty-handed request fails; its replacement carries the ack.
    assert!(test.transport.fail_publish(connection_lost()));
    let transport = Arc::clone(&test.transport);
    wait_until("the acknowledgement is sent", move || {
        transport.publish_acknowledgements().len() == 3
    })
    .await;
    assert_eq!(
        test.transport.publish_acknowledgements()[2],
        vec![SubscriptionAcknowledgement::new(id, 1)]
    );

    // Losing that request loses the acknowledgement for good.
    assert!(test.transport.fail_newest_publish(connection_lost()));
    let transport = Arc::clone(&test.transport);
    wait_until("the pipeline is re-armed", move || {
        transport.publish_acknowledgements().len() == 4
    })
    .await;

    assert!(test.transport.publish_acknowledgements()[3].is_empty());
    assert_eq!(test.manager().pending_acknowledgements(), 0);
    assert_eq!(test.manager().stats().acknowledgements_dropped(), 1);
    assert_eq!(test.manager().stats().publish_failures(), 2);
}

#[tokio::test]
async fn test_acknowledgements_of_deleted_subscription_discarded() {
    init_test_logging();
    let test =
        TestClient::connect_with(MockTransport::new(), ConfigFixtures::with_pipeline_depth(1))
            .await;
    let kept = test.subscription().await;
    let deleted = test.subscription().await;
    test.wait_for_publishes(2).await;

    assert!(test.transport.respond_publish(NotificationFixtures::publish(
        deleted.subscription_id(),
        NotificationFixtures::status_change(1, StatusCode::GOOD),
    )));
    let manager = Arc::clone(test.manager());
    wait_until("the acknowledgement is pending", move || {
        manager.pending_acknowledgements() == 1
    })
    .await;

    test.manager().delete_subscription(&deleted).await.unwrap();
    assert_eq!(test.manager().pending_acknowledgements(), 0);

    assert!(test
        .transport
        .respond_publish(keep_alive(kept.subscription_id())));
    settle().await;
    assert!(test
        .transport
        .publish_acknowledgements()
        .iter()
        .flatten()
        .all(|ack| ack.subscription_id != deleted.subscription_id()));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_failure_rearms_publish() {
    init_test_logging();
    let test = TestClient::connect().await;
    test.subscription().await;
    test.wait_for_publishes(2).await;

    assert!(test.transport.fail_publish(connection_lost()));
    test.wait_for_publishes(2).await;
    settle().await;

    assert_eq!(test.transport.request_count("Publish"), 3);
    assert_eq!(test.transport.outstanding_publishes(), 2);
    assert_eq!(test.manager().stats().publish_failures(), 1);
}

#[tokio::test]
async fn test_failure_too_many_requests_not_rearmed() {
    init_test_logging();
    let test = TestClient::connect().await;
    let subscription = test.subscription().await;
    test.wait_for_publishes(2).await;

    assert!(test
        .transport
        .reject_publish(StatusCode::BAD_TOO_MANY_PUBLISH_REQUESTS));
    settle().await;

    assert_eq!(test.transport.outstanding_publishes(), 1);
    assert_eq!(test.manager().in_flight(), 1);
    assert_eq!(test.transport.request_count("Publish"), 2);

    // The next response refills the pipeline.
    assert!(test
        .transport
        .respond_publish(keep_alive(subscription.subscription_id())));
    test.wait_for_publishes(2).await;
    settle().await;
    assert_eq!(test.transport.outstanding_publishes(), 2);
}

#[tokio::test]
async fn test_failure_too_many_requests_rearmed_when_alone() {
    init_test_logging();
    let test =
        TestClient::connect_with(MockTransport::new(), ConfigFixtures::with_pipeline_depth(1))
            .await;
    test.subscription().await;
    test.wait_for_publishes(1).await;

    assert!(test
        .transport
        .reject_publish(StatusCode::BAD_TOO_MANY_PUBLISH_REQUESTS));
    test.wait_for_publishes(1).await;

    assert_eq!(test.transport.request_count("Publish"), 2);
}

#[tokio::test]
async fn test_failure_backoff_delays_rearm() {
    init_test_logging();
    let backoff = Duration::from_millis(200);
    let test = TestClient::connect_with(
        MockTransport::new(),
        ClientConfig {
            publish_pipeline_depth: 1,
            ..ConfigFixtures::with_publish_backoff(backoff)
        },
    )
    .await;
    test.subscription().await;
    test.wait_for_publishes(1).await;

    let failed_at = Instant::now();
    assert!(test.transport.fail_publish(connection_lost()));
    settle().await;
    assert_eq!(test.transport.outstanding_publishes(), 0);

    test.wait_for_publishes(1).await;
    assert!(failed_at.elapsed() >= Duration::from_millis(150));
    assert_eq!(test.transport.request_count("Publish"), 2);
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_shutdown_stops_publish_loop() {
    init_test_logging();
    let test = TestClient::connect().await;
    test.subscription().await;
    test.wait_for_publishes(2).await;

    test.client.disconnect().await;
    let manager = Arc::clone(test.manager());
    wait_until("outstanding publishes are abandoned", move || {
        manager.in_flight() == 0
    })
    .await;

    let sent = test.transport.request_count("Publish");
    settle().await;
    assert_eq!(test.transport.request_count("Publish"), sent);
    assert_eq!(sent, 2);
}
