// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Sequencing Integration Tests
//!
//! - `test_in_order_*`: contiguous delivery
//! - `test_gap_*`: Republish recovery and its Read fallback
//! - `test_keep_alive_*`: keep-alive cursor handling
//! - `test_wrap_*` / `test_late_*`: sequence number edges
//! - `test_dispatch_*`: routing of non-data notifications
//! - `test_shutdown_*`: recoveries interrupted by disconnect

use std::sync::Arc;

use uasub_client::messages::{NotificationMessage, PublishResponse};
use uasub_client::{
    DataValue, MonitoredItem, MonitoredItemRequest, NodeId, SessionError, SessionStateKind,
    StatusCode, UaError, UaSubscription,
};

use uasub_tests::common::{
    init_test_logging, int_values, settle, wait_until, NotificationFixtures, TestClient,
    ValueRecorder,
};

/// A connected client with one subscription and its value items.
struct Fixture {
    test: TestClient,
    subscription: Arc<UaSubscription>,
    items: Vec<Arc<MonitoredItem>>,
    recorders: Vec<ValueRecorder>,
}

impl Fixture {
    async fn new(item_count: u32) -> Self {
        init_test_logging();
        let test = TestClient::connect().await;
        let subscription = test.subscription().await;
        let items = test.value_items(&subscription, item_count).await;
        let recorders = items.iter().map(|item| ValueRecorder::attach(item)).collect();
        Self {
            test,
            subscription,
            items,
            recorders,
        }
    }

    fn id(&self) -> u32 {
        self.subscription.subscription_id()
    }

    fn handles(&self) -> Vec<u32> {
        self.items.iter().map(|item| item.client_handle()).collect()
    }

    /// Data change for every item carrying `value`.
    fn message(&self, sequence_number: u32, value: i32) -> NotificationMessage {
        NotificationFixtures::data_changes(sequence_number, &self.handles(), value)
    }

    async fn respond(&self, response: PublishResponse) {
        self.test.wait_for_publishes(1).await;
        assert!(self.test.transport.respond_publish(response));
    }

    async fn send(&self, sequence_number: u32, value: i32) {
        self.respond(NotificationFixtures::publish(
            self.id(),
            self.message(sequence_number, value),
        ))
        .await;
    }

    async fn wait_for_values(&self, count: usize) {
        let recorders = self.recorders.clone();
        wait_until(&format!("every item has {count} values"), move || {
            recorders.iter().all(|recorder| recorder.len() >= count)
        })
        .await;
    }

    fn values(&self, item: usize) -> Vec<i32> {
        int_values(&self.recorders[item].values())
    }

    fn last_sequence_number(&self) -> Option<u32> {
        self.test.manager().last_sequence_number(self.id())
    }
}

// =============================================================================
// In order
// =============================================================================

#[tokio::test]
async fn test_in_order_dispatched_once() {
    let fixture = Fixture::new(1).await;

    for seq in 1..=5 {
        fixture.send(seq, seq as i32 * 10).await;
    }
    fixture.wait_for_values(5).await;
    settle().await;

    assert_eq!(fixture.values(0), vec![10, 20, 30, 40, 50]);
    assert_eq!(
        fixture.test.listener.sequence_numbers(fixture.id()),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(fixture.last_sequence_number(), Some(5));
    assert!(fixture.test.transport.republished().is_empty());
    assert_eq!(fixture.test.manager().stats().gaps_detected(), 0);
    assert_eq!(fixture.subscription.notification_messages(), 5);
}

#[tokio::test]
async fn test_in_order_cursors_are_per_subscription() {
    let fixture = Fixture::new(1).await;
    let other = fixture.test.subscription().await;

    fixture.send(1, 1).await;
    fixture
        .respond(NotificationFixtures::publish(
            other.subscription_id(),
            NotificationFixtures::status_change(1, StatusCode::GOOD),
        ))
        .await;
    fixture.send(2, 2).await;
    fixture.wait_for_values(2).await;

    assert!(fixture.test.transport.republished().is_empty());
    assert_eq!(fixture.last_sequence_number(), Some(2));
    assert_eq!(
        fixture
            .test
            .manager()
            .last_sequence_number(other.subscription_id()),
        Some(1)
    );
}

// =============================================================================
// Gap recovery
// =============================================================================

#[tokio::test]
async fn test_gap_republishes_each_missing_message() {
    let fixture = Fixture::new(1).await;
    let id = fixture.id();
    for seq in 2..=4 {
        fixture
            .test
            .transport
            .retain_for_republish(id, fixture.message(seq, seq as i32 * 10));
    }

    fixture.send(1, 10).await;
    fixture.wait_for_values(1).await;
    fixture.send(5, 50).await;
    fixture.wait_for_values(5).await;
    settle().await;

    assert_eq!(
        fixture.test.transport.republished(),
        vec![(id, 2), (id, 3), (id, 4)]
    );
    assert_eq!(fixture.values(0), vec![10, 20, 30, 40, 50]);
    assert_eq!(
        fixture.test.listener.sequence_numbers(id),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(fixture.last_sequence_number(), Some(5));

    let stats = fixture.test.manager().stats();
    assert_eq!(stats.gaps_detected(), 1);
    assert_eq!(stats.messages_republished(), 3);
    assert_eq!(stats.recovery_fallbacks(), 0);
}

#[tokio::test]
async fn test_gap_fallback_reads_each_item() {
    let fixture = Fixture::new(3).await;
    fixture
        .test
        .transport
        .set_read_value(DataValue::new(77i32));

    fixture.send(1, 10).await;
    fixture.wait_for_values(1).await;
    let reads_before = fixture.test.transport.request_count("Read");

    // Nothing is retained, so the first Republish fails.
    fixture.send(5, 50).await;
    fixture.wait_for_values(3).await;
    settle().await;

    assert_eq!(
        fixture.test.transport.request_count("Read"),
        reads_before + 3
    );
    assert_eq!(fixture.test.transport.republished(), vec![(fixture.id(), 2)]);
    for item in 0..3 {
        assert_eq!(fixture.values(item), vec![10, 77, 50]);
    }
    assert_eq!(fixture.last_sequence_number(), Some(5));

    let stats = fixture.test.manager().stats();
    assert_eq!(stats.recovery_fallbacks(), 1);
    assert_eq!(stats.fallback_reads(), 3);
}

#[tokio::test]
async fn test_gap_fallback_read_failure_keeps_last_value() {
    let fixture = Fixture::new(2).await;
    fixture.test.transport.set_fail_reads(true);

    fixture.send(1, 10).await;
    fixture.wait_for_values(1).await;
    fixture.send(4, 40).await;
    fixture.wait_for_values(2).await;
    settle().await;

    for item in 0..2 {
        assert_eq!(fixture.values(item), vec![10, 40]);
    }
    assert_eq!(fixture.test.manager().stats().fallback_reads(), 2);
    assert_eq!(fixture.last_sequence_number(), Some(4));
}

#[tokio::test]
async fn test_gap_mismatched_republish_falls_back() {
    let fixture = Fixture::new(1).await;
    let id = fixture.id();
    fixture
        .test
        .transport
        .retain_mismatched(id, 2, fixture.message(3, 30));

    fixture.send(1, 10).await;
    fixture.wait_for_values(1).await;
    fixture.send(4, 40).await;
    fixture.wait_for_values(3).await;
    settle().await;

    assert_eq!(fixture.test.transport.republished(), vec![(id, 2)]);
    // The mock answers Read with -1 by default.
    assert_eq!(fixture.values(0), vec![10, -1, 40]);
    assert_eq!(fixture.test.manager().stats().messages_republished(), 0);
    assert_eq!(fixture.test.manager().stats().recovery_fallbacks(), 1);
    assert_eq!(fixture.last_sequence_number(), Some(4));
}

#[tokio::test]
async fn test_gap_recovery_continues_with_later_messages() {
    let fixture = Fixture::new(1).await;
    let id = fixture.id();
    fixture
        .test
        .transport
        .retain_for_republish(id, fixture.message(2, 20));

    fixture.send(1, 10).await;
    fixture.wait_for_values(1).await;
    fixture.send(3, 30).await;
    fixture.send(4, 40).await;
    fixture.wait_for_values(4).await;
    settle().await;

    assert_eq!(fixture.values(0), vec![10, 20, 30, 40]);
    assert_eq!(fixture.test.transport.republished(), vec![(id, 2)]);
    assert_eq!(fixture.test.manager().stats().gaps_detected(), 1);
    assert_eq!(fixture.last_sequence_number(), Some(4));
}

// =============================================================================
// Keep-alive
// =============================================================================

#[tokio::test]
async fn test_keep_alive_leaves_cursor() {
    let fixture = Fixture::new(1).await;
    let id = fixture.id();

    fixture.send(1, 10).await;
    fixture.wait_for_values(1).await;
    fixture
        .respond(NotificationFixtures::publish(
            id,
            NotificationMessage::keep_alive(2),
        ))
        .await;
    let listener = Arc::clone(&fixture.test.listener);
    wait_until("the keep-alive is dispatched", move || {
        listener.keep_alive_count(id) == 1
    })
    .await;
    assert_eq!(fixture.last_sequence_number(), Some(1));

    fixture.send(2, 20).await;
    fixture.wait_for_values(2).await;

    assert!(fixture.test.transport.republished().is_empty());
    assert_eq!(fixture.last_sequence_number(), Some(2));
    assert_eq!(fixture.test.manager().stats().keep_alives(), 1);
    assert_eq!(fixture.subscription.keep_alives(), 1);
}

#[tokio::test]
async fn test_keep_alive_reveals_gap() {
    let fixture = Fixture::new(1).await;
    let id = fixture.id();
    for seq in 2..=3 {
        fixture
            .test
            .transport
            .retain_for_republish(id, fixture.message(seq, seq as i32 * 10));
    }

    fixture.send(1, 10).await;
    fixture.wait_for_values(1).await;
    fixture
        .respond(NotificationFixtures::publish(
            id,
            NotificationMessage::keep_alive(4),
        ))
        .await;
    fixture.wait_for_values(3).await;
    settle().await;

    assert_eq!(fixture.test.transport.republished(), vec![(id, 2), (id, 3)]);
    assert_eq!(fixture.values(0), vec![10, 20, 30]);
    assert_eq!(fixture.last_sequence_number(), Some(3));
    assert_eq!(fixture.test.listener.keep_alive_count(id), 1);
}

// =============================================================================
// Sequence number edges
// =============================================================================

#[tokio::test]
async fn test_wrap_from_max_to_one() {
    let fixture = Fixture::new(1).await;

    fixture.send(u32::MAX, 1).await;
    fixture.wait_for_values(1).await;
    fixture.send(1, 2).await;
    fixture.wait_for_values(2).await;
    settle().await;

    assert_eq!(fixture.values(0), vec![1, 2]);
    assert!(fixture.test.transport.republished().is_empty());
    assert_eq!(fixture.last_sequence_number(), Some(1));
}

#[tokio::test]
async fn test_wrap_gap_across_max() {
    let fixture = Fixture::new(1).await;
    let id = fixture.id();
    fixture
        .test
        .transport
        .retain_for_republish(id, fixture.message(u32::MAX, 2));
    fixture
        .test
        .transport
        .retain_for_republish(id, fixture.message(1, 3));

    fixture.send(u32::MAX - 1, 1).await;
    fixture.wait_for_values(1).await;
    fixture.send(2, 4).await;
    fixture.wait_for_values(4).await;
    settle().await;

    assert_eq!(
        fixture.test.transport.republished(),
        vec![(id, u32::MAX), (id, 1)]
    );
    assert_eq!(fixture.values(0), vec![1, 2, 3, 4]);
    assert_eq!(fixture.last_sequence_number(), Some(2));
}

#[tokio::test]
async fn test_late_message_does_not_rewind_cursor() {
    let fixture = Fixture::new(1).await;

    fixture.send(1, 10).await;
    fixture.send(2, 20).await;
    fixture.wait_for_values(2).await;
    fixture.send(1, 11).await;
    fixture.wait_for_values(3).await;
    settle().await;

    assert_eq!(fixture.values(0), vec![10, 20, 11]);
    assert_eq!(fixture.last_sequence_number(), Some(2));
    assert!(fixture.test.transport.republished().is_empty());

    fixture.send(3, 30).await;
    fixture.wait_for_values(4).await;
    assert!(fixture.test.transport.republished().is_empty());
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn test_dispatch_status_change_to_listener() {
    let fixture = Fixture::new(1).await;
    let id = fixture.id();

    fixture
        .respond(NotificationFixtures::publish(
            id,
            NotificationFixtures::status_change(1, StatusCode::BAD_TIMEOUT),
        ))
        .await;
    let listener = Arc::clone(&fixture.test.listener);
    wait_until("the status change is dispatched", move || {
        !listener.status_changes().is_empty()
    })
    .await;

    assert_eq!(
        fixture.test.listener.status_changes(),
        vec![(id, StatusCode::BAD_TIMEOUT)]
    );
    assert!(fixture.recorders[0].is_empty());
    assert_eq!(fixture.last_sequence_number(), Some(1));
}

#[tokio::test]
async fn test_dispatch_drops_unknown_subscription() {
    let fixture = Fixture::new(1).await;

    fixture
        .respond(NotificationFixtures::publish(
            999,
            NotificationFixtures::data_change(1, fixture.items[0].client_handle(), 5),
        ))
        .await;
    settle().await;

    assert!(fixture.recorders[0].is_empty());
    assert_eq!(fixture.test.manager().last_sequence_number(999), None);
    assert_eq!(fixture.test.manager().stats().notification_messages(), 0);
    assert_eq!(fixture.test.manager().pending_acknowledgements(), 0);
}

// =============================================================================
// Shutdown
// =============================================================================

/// Sends seq 1, then `received`, and waits until the first Republish is parked.
async fn park_recovery(fixture: &Fixture, received: u32) {
    fixture.test.transport.hold_republish();
    fixture.send(1, 10).await;
    fixture.wait_for_values(1).await;
    fixture.send(received, received as i32 * 10).await;

    let transport = Arc::clone(&fixture.test.transport);
    wait_until("Republish is parked", move || {
        transport.republished().len() == 1
    })
    .await;
}

#[tokio::test]
async fn test_shutdown_during_recovery_skips_fallback() {
    let fixture = Fixture::new(1).await;
    let transport = Arc::clone(&fixture.test.transport);

    // Nothing retained: the parked Republish fails once released.
    park_recovery(&fixture, 3).await;
    let reads_before = transport.request_count("Read");

    fixture.test.client.disconnect().await;
    transport.release_republish();
    settle().await;

    assert_eq!(transport.request_count("CreateSession"), 1);
    assert_eq!(transport.request_count("Read"), reads_before);
    assert_eq!(transport.republished(), vec![(fixture.id(), 2)]);
    assert_eq!(
        fixture.test.client.client().session_fsm().state(),
        SessionStateKind::Inactive
    );
    assert_eq!(fixture.test.manager().stats().recovery_fallbacks(), 0);
    assert_eq!(fixture.last_sequence_number(), Some(1));

    let err = fixture.test.client.session().await.unwrap_err();
    assert!(matches!(err, UaError::Session(SessionError::ClientShutdown)));
    assert_eq!(transport.request_count("CreateSession"), 1);
}

#[tokio::test]
async fn test_shutdown_during_recovery_stops_republish_and_resumes_delivery() {
    let fixture = Fixture::new(2).await;
    let transport = Arc::clone(&fixture.test.transport);
    let id = fixture.id();
    transport.retain_for_republish(id, fixture.message(2, 20));
    transport.retain_for_republish(id, fixture.message(3, 30));

    park_recovery(&fixture, 4).await;
    fixture.test.client.disconnect().await;
    transport.release_republish();

    // The in-flight message still reaches the items once delivery resumes.
    fixture.wait_for_values(2).await;
    settle().await;

    assert_eq!(transport.republished(), vec![(id, 2)]);
    assert_eq!(transport.request_count("CreateSession"), 1);
    for item in 0..2 {
        assert_eq!(fixture.values(item), vec![10, 20]);
    }
    assert_eq!(fixture.test.manager().stats().messages_republished(), 1);
    assert_eq!(fixture.last_sequence_number(), Some(1));
}

// =============================================================================
// Event items
// =============================================================================

#[tokio::test]
async fn test_gap_fallback_skips_event_items() {
    let fixture = Fixture::new(2).await;
    let transport = Arc::clone(&fixture.test.transport);
    transport.set_read_value(DataValue::new(77i32));

    let events = fixture
        .test
        .manager()
        .create_monitored_items(
            &fixture.subscription,
            vec![MonitoredItemRequest::events(NodeId::numeric(0, 2253))],
        )
        .await
        .unwrap()
        .pop()
        .unwrap()
        .unwrap();
    assert!(events.is_event_item());
    let event_values = ValueRecorder::attach(&events);

    fixture.send(1, 10).await;
    fixture.wait_for_values(1).await;
    let reads_before = transport.request_count("Read");

    fixture.send(3, 30).await;
    fixture.wait_for_values(3).await;
    settle().await;

    assert_eq!(transport.request_count("Read"), reads_before + 2);
    assert_eq!(fixture.test.manager().stats().fallback_reads(), 2);
    for item in 0..2 {
        assert_eq!(fixture.values(item), vec![10, 77, 30]);
    }
    assert!(event_values.is_empty());
    assert!(events.last_value().is_none());
}
