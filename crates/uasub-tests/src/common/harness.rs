// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Connected client setup and polling helpers.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use uasub_client::{
    ClientConfig, MonitoredItem, MonitoredItemRequest, NodeId, SubscriptionManager, UaClient,
    UaSubscription, Variant,
};

use super::fixtures::ConfigFixtures;
use super::mocks::{MockTransport, RecordingListener};

/// Default deadline for [`wait_until`].
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Polls `condition` until it holds, panicking after [`WAIT_TIMEOUT`].
pub async fn wait_until<F>(description: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting until {description}");
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Lets spawned tasks run for a short while.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// =============================================================================
// Test Client
// =============================================================================

/// A connected client with its mock server.
pub struct TestClient {
    /// Mock server.
    pub transport: Arc<MockTransport>,
    /// Connected client.
    pub client: UaClient,
    /// Listener registered on the subscription manager.
    pub listener: Arc<RecordingListener>,
}

impl TestClient {
    /// Connects to a fresh mock server with the default configuration.
    pub async fn connect() -> Self {
        Self::connect_with(MockTransport::new(), ConfigFixtures::client()).await
    }

    /// Connects to `transport` with `config`.
    pub async fn connect_with(transport: MockTransport, config: ClientConfig) -> Self {
        let transport = Arc::new(transport);
        let client = UaClient::connect(transport.clone(), config)
            .await
            .expect("connect to mock server");
        let listener = RecordingListener::new();
        client.subscription_manager().add_listener(listener.clone());
        Self {
            transport,
            client,
            listener,
        }
    }

    /// Subscription manager.
    pub fn manager(&self) -> &Arc<SubscriptionManager> {
        self.client.subscription_manager()
    }

    /// Creates a subscription with a 1 s publishing interval.
    pub async fn subscription(&self) -> Arc<UaSubscription> {
        self.manager()
            .create_subscription_with_interval(1000.0)
            .await
            .expect("create subscription")
    }

    /// Creates `count` value items on `subscription`.
    pub async fn value_items(
        &self,
        subscription: &Arc<UaSubscription>,
        count: u32,
    ) -> Vec<Arc<MonitoredItem>> {
        let requests = (0..count)
            .map(|i| MonitoredItemRequest::value(NodeId::numeric(2, 1000 + i)))
            .collect();
        self.manager()
            .create_monitored_items(subscription, requests)
            .await
            .expect("create monitored items")
            .into_iter()
            .map(|result| result.expect("item accepted"))
            .collect()
    }

    /// Waits until at least `count` Publish requests are parked.
    pub async fn wait_for_publishes(&self, count: usize) {
        let transport = Arc::clone(&self.transport);
        wait_until(&format!("{count} publishes are outstanding"), move || {
            transport.outstanding_publishes() >= count
        })
        .await;
    }
}

// =============================================================================
// Value Recorder
// =============================================================================

/// Records every value delivered to a monitored item.
#[derive(Debug, Clone, Default)]
pub struct ValueRecorder {
    values: Arc<Mutex<Vec<Variant>>>,
}

impl ValueRecorder {
    /// Registers a recorder as `item`'s value callback.
    pub fn attach(item: &MonitoredItem) -> Self {
        let recorder = Self::default();
        let values = Arc::clone(&recorder.values);
        item.on_value_arrived(move |_, value| values.lock().push(value.value.clone()));
        recorder
    }

    /// Values seen, in delivery order.
    pub fn values(&self) -> Vec<Variant> {
        self.values.lock().clone()
    }

    /// Number of values seen.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Returns `true` if no value was seen.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
