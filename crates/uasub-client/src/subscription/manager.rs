// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription manager.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::client::{AttributeStore, SessionClient};
use crate::error::{SubscriptionError, UaError, UaResult};
use crate::execution_queue::ExecutionQueue;
use crate::messages::{
    CreateMonitoredItemsRequest, CreateSubscriptionRequest, DeleteMonitoredItemsRequest,
    DeleteSubscriptionsRequest, ModifySubscriptionRequest, MonitoredItemCreateRequest,
    MonitoringParameters, SetPublishingModeRequest,
};
use crate::types::{StatusCode, TimestampsToReturn};

use super::dispatch::{Dispatcher, SubscriptionListener};
use super::item::{MonitoredItem, MonitoredItemRequest};
use super::model::{SubscriptionParameters, UaSubscription};
use super::publish::{PendingAcknowledgements, Publisher};
use super::registry::SubscriptionRegistry;
use super::sequencing::Sequencer;

// =============================================================================
// SubscriptionManager
// =============================================================================

/// Owns the subscriptions of one client and keeps their notifications
/// flowing.
///
/// Creating, modifying or deleting a subscription reassesses the publish
/// pipeline. Notification messages pass through the sequencing engine on
/// the processing queue and reach monitored items on the delivery queue.
///
/// Dropping the manager shuts it down.
pub struct SubscriptionManager {
    client: Arc<SessionClient>,
    registry: Arc<SubscriptionRegistry>,
    processing: Arc<ExecutionQueue>,
    dispatcher: Arc<Dispatcher>,
    sequencer: Arc<Sequencer>,
    publisher: Arc<Publisher>,
    acknowledgements: Arc<PendingAcknowledgements>,
    next_client_handle: AtomicU32,
    running: AtomicBool,
    stats: Arc<SubscriptionManagerStats>,
}

impl SubscriptionManager {
    /// Creates a manager issuing requests through `client`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(client: Arc<SessionClient>) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let processing = Arc::new(ExecutionQueue::new("processing"));
        let delivery = Arc::new(ExecutionQueue::new("delivery"));
        let acknowledgements = Arc::new(PendingAcknowledgements::new());
        let stats = Arc::new(SubscriptionManagerStats::new());

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&stats),
        ));

        let store: Arc<dyn AttributeStore> = Arc::clone(&client) as Arc<dyn AttributeStore>;
        let sequencer = Arc::new(Sequencer::new(
            Arc::clone(&client),
            store,
            Arc::clone(&registry),
            Arc::clone(&acknowledgements),
            Arc::clone(&processing),
            delivery,
            Arc::clone(&dispatcher),
            Arc::clone(&stats),
        ));

        let publisher = Arc::new(Publisher::new(
            Arc::clone(&client),
            Arc::clone(&registry),
            Arc::clone(&sequencer),
            Arc::clone(&processing),
            Arc::clone(&acknowledgements),
            Arc::clone(&stats),
        ));

        Self {
            client,
            registry,
            processing,
            dispatcher,
            sequencer,
            publisher,
            acknowledgements,
            next_client_handle: AtomicU32::new(1),
            running: AtomicBool::new(true),
            stats,
        }
    }

    fn ensure_running(&self) -> UaResult<()> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(UaError::subscription(SubscriptionError::ManagerShutdown))
        }
    }

    fn ensure_registered(&self, subscription: &UaSubscription) -> UaResult<()> {
        if self.registry.contains(subscription.subscription_id()) {
            Ok(())
        } else {
            Err(UaError::subscription(SubscriptionError::not_found(
                subscription.subscription_id(),
            )))
        }
    }

    fn next_client_handle(&self) -> u32 {
        loop {
            let handle = self.next_client_handle.fetch_add(1, Ordering::Relaxed);
            if handle != 0 {
                return handle;
            }
        }
    }

    // =========================================================================
    // Subscription lifecycle
    // =========================================================================

    /// Creates a subscription.
    ///
    /// The returned subscription carries the values revised by the server.
    pub async fn create_subscription(
        &self,
        parameters: SubscriptionParameters,
    ) -> UaResult<Arc<UaSubscription>> {
        self.ensure_running()?;
        parameters.validate()?;

        let start = Instant::now();
        let response = self
            .client
            .call(|request_header| CreateSubscriptionRequest {
                request_header,
                requested_publishing_interval: parameters.publishing_interval,
                requested_lifetime_count: parameters.lifetime_count,
                requested_max_keep_alive_count: parameters.max_keep_alive_count,
                max_notifications_per_publish: parameters.max_notifications_per_publish,
                publishing_enabled: parameters.publishing_enabled,
                priority: parameters.priority,
            })
            .await?;

        let revised = SubscriptionParameters {
            publishing_interval: response.revised_publishing_interval,
            lifetime_count: response.revised_lifetime_count,
            max_keep_alive_count: response.revised_max_keep_alive_count,
            ..parameters
        };
        let subscription = Arc::new(UaSubscription::new(response.subscription_id, revised));
        self.registry.insert(Arc::clone(&subscription));
        self.stats.record_subscription_created(start.elapsed());

        info!(
            subscription_id = response.subscription_id,
            publishing_interval = revised.publishing_interval,
            lifetime_count = revised.lifetime_count,
            max_keep_alive_count = revised.max_keep_alive_count,
            "Subscription created"
        );

        self.publisher.maybe_send_publish();
        Ok(subscription)
    }

    /// Creates a subscription from a publishing interval alone.
    ///
    /// See [`SubscriptionParameters::with_interval`] for the derived counts.
    pub async fn create_subscription_with_interval(
        &self,
        publishing_interval: f64,
    ) -> UaResult<Arc<UaSubscription>> {
        let parameters = SubscriptionParameters::with_interval(publishing_interval)
            .with_max_notifications(self.client.config().max_notifications_per_publish);
        self.create_subscription(parameters).await
    }

    /// Modifies `subscription` in place.
    ///
    /// The publishing-enabled flag is not part of a modify; use
    /// [`set_publishing_mode`](Self::set_publishing_mode).
    pub async fn modify_subscription(
        &self,
        subscription: &Arc<UaSubscription>,
        parameters: SubscriptionParameters,
    ) -> UaResult<()> {
        self.ensure_running()?;
        self.ensure_registered(subscription)?;
        parameters.validate()?;

        let subscription_id = subscription.subscription_id();
        let response = self
            .client
            .call(|request_header| ModifySubscriptionRequest {
                request_header,
                subscription_id,
                requested_publishing_interval: parameters.publishing_interval,
                requested_lifetime_count: parameters.lifetime_count,
                requested_max_keep_alive_count: parameters.max_keep_alive_count,
                max_notifications_per_publish: parameters.max_notifications_per_publish,
                priority: parameters.priority,
            })
            .await?;

        subscription.apply_revised(
            response.revised_publishing_interval,
            response.revised_lifetime_count,
            response.revised_max_keep_alive_count,
            &parameters,
        );

        info!(
            subscription_id,
            publishing_interval = response.revised_publishing_interval,
            max_keep_alive_count = response.revised_max_keep_alive_count,
            "Subscription modified"
        );

        self.publisher.maybe_send_publish();
        Ok(())
    }

    /// Changes the publishing interval of `subscription`, deriving keep-alive
    /// and lifetime counts the same way as
    /// [`create_subscription_with_interval`](Self::create_subscription_with_interval).
    pub async fn modify_subscription_interval(
        &self,
        subscription: &Arc<UaSubscription>,
        publishing_interval: f64,
    ) -> UaResult<()> {
        let current = subscription.parameters();
        let parameters = SubscriptionParameters::with_interval(publishing_interval)
            .with_max_notifications(current.max_notifications_per_publish)
            .with_priority(current.priority)
            .with_publishing_enabled(current.publishing_enabled);
        self.modify_subscription(subscription, parameters).await
    }

    /// Deletes `subscription` on the server and forgets it locally.
    ///
    /// A subscription the server no longer knows is removed as well.
    pub async fn delete_subscription(&self, subscription: &Arc<UaSubscription>) -> UaResult<()> {
        self.ensure_running()?;
        self.ensure_registered(subscription)?;

        let subscription_id = subscription.subscription_id();
        let response = self
            .client
            .call(|request_header| DeleteSubscriptionsRequest {
                request_header,
                subscription_ids: vec![subscription_id],
            })
            .await?;

        let status = response
            .results
            .first()
            .copied()
            .unwrap_or(StatusCode::BAD_UNKNOWN_RESPONSE);
        if status.is_bad() && status != StatusCode::BAD_SUBSCRIPTION_ID_INVALID {
            return Err(UaError::bad_status("DeleteSubscriptions", status));
        }

        self.registry.remove(subscription_id);
        self.sequencer.forget(subscription_id);
        self.acknowledgements.discard_subscription(subscription_id);
        self.stats.record_subscription_deleted();

        info!(subscription_id, status = %status, "Subscription deleted");

        self.publisher.maybe_send_publish();
        Ok(())
    }

    /// Enables or disables publishing for `subscription`.
    pub async fn set_publishing_mode(
        &self,
        subscription: &Arc<UaSubscription>,
        publishing_enabled: bool,
    ) -> UaResult<()> {
        self.ensure_running()?;
        self.ensure_registered(subscription)?;

        let subscription_id = subscription.subscription_id();
        let response = self
            .client
            .call(|request_header| SetPublishingModeRequest {
                request_header,
                publishing_enabled,
                subscription_ids: vec![subscription_id],
            })
            .await?;

        let status = response
            .results
            .first()
            .copied()
            .unwrap_or(StatusCode::BAD_UNKNOWN_RESPONSE);
        if status.is_bad() {
            return Err(UaError::bad_status("SetPublishingMode", status));
        }

        subscription.set_publishing_enabled(publishing_enabled);
        debug!(subscription_id, publishing_enabled, "Publishing mode set");
        Ok(())
    }

    // =========================================================================
    // Monitored items
    // =========================================================================

    /// Creates monitored items on `subscription`.
    ///
    /// Returns one result per request, in request order. Items the server
    /// rejected carry a [`SubscriptionError::MonitoredItemFailed`].
    pub async fn create_monitored_items(
        &self,
        subscription: &Arc<UaSubscription>,
        requests: Vec<MonitoredItemRequest>,
    ) -> UaResult<Vec<UaResult<Arc<MonitoredItem>>>> {
        self.ensure_running()?;
        self.ensure_registered(subscription)?;

        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let subscription_id = subscription.subscription_id();
        let handles: Vec<u32> = requests.iter().map(|_| self.next_client_handle()).collect();
        let items_to_create = requests
            .iter()
            .zip(&handles)
            .map(|(request, &client_handle)| MonitoredItemCreateRequest {
                item_to_monitor: request.item_to_monitor.clone(),
                monitoring_mode: request.monitoring_mode,
                requested_parameters: MonitoringParameters {
                    client_handle,
                    sampling_interval: request.sampling_interval,
                    queue_size: request.queue_size,
                    discard_oldest: request.discard_oldest,
                },
            })
            .collect();

        let response = self
            .client
            .call(|request_header| CreateMonitoredItemsRequest {
                request_header,
                subscription_id,
                timestamps_to_return: TimestampsToReturn::Both,
                items_to_create,
            })
            .await?;

        if response.results.len() != requests.len() {
            return Err(UaError::bad_status(
                "CreateMonitoredItems",
                StatusCode::BAD_UNKNOWN_RESPONSE,
            ));
        }

        let capacity = self.client.config().value_channel_capacity;
        let outcomes = requests
            .iter()
            .zip(handles)
            .zip(&response.results)
            .map(|((request, client_handle), result)| {
                if result.status_code.is_bad() {
                    warn!(
                        subscription_id,
                        node_id = %request.item_to_monitor.node_id,
                        status = %result.status_code,
                        "Monitored item rejected"
                    );
                    return Err(UaError::subscription(SubscriptionError::monitored_item_failed(
                        request.item_to_monitor.node_id.to_string(),
                        result.status_code,
                    )));
                }

                let item = Arc::new(MonitoredItem::new(
                    subscription_id,
                    client_handle,
                    request,
                    result,
                    capacity,
                ));
                subscription.insert_item(Arc::clone(&item));
                Ok(item)
            })
            .collect::<Vec<_>>();

        debug!(
            subscription_id,
            requested = requests.len(),
            created = outcomes.iter().filter(|outcome| outcome.is_ok()).count(),
            "Monitored items created"
        );

        Ok(outcomes)
    }

    /// Deletes monitored items from `subscription`.
    ///
    /// Returns the server status per item. Items the server deleted or no
    /// longer knows are removed locally.
    pub async fn delete_monitored_items(
        &self,
        subscription: &Arc<UaSubscription>,
        items: &[Arc<MonitoredItem>],
    ) -> UaResult<Vec<StatusCode>> {
        self.ensure_running()?;
        self.ensure_registered(subscription)?;

        if items.is_empty() {
            return Ok(Vec::new());
        }

        let subscription_id = subscription.subscription_id();
        let monitored_item_ids = items.iter().map(|item| item.monitored_item_id()).collect();
        let response = self
            .client
            .call(|request_header| DeleteMonitoredItemsRequest {
                request_header,
                subscription_id,
                monitored_item_ids,
            })
            .await?;

        for (item, status) in items.iter().zip(&response.results) {
            if status.is_good() || *status == StatusCode::BAD_MONITORED_ITEM_ID_INVALID {
                subscription.remove_item(item.client_handle());
            }
        }

        debug!(subscription_id, count = items.len(), "Monitored items deleted");
        Ok(response.results)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Looks up a subscription by id.
    pub fn subscription(&self, subscription_id: u32) -> Option<Arc<UaSubscription>> {
        self.registry.get(subscription_id)
    }

    /// All subscriptions, ordered by id.
    pub fn subscriptions(&self) -> Vec<Arc<UaSubscription>> {
        self.registry.subscriptions()
    }

    /// Number of subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    /// Registers a subscription-level observer.
    pub fn add_listener(&self, listener: Arc<dyn SubscriptionListener>) {
        self.dispatcher.add_listener(listener);
    }

    /// Publish requests currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.publisher.in_flight()
    }

    /// Upper bound on outstanding Publish requests.
    pub fn max_pending(&self) -> usize {
        self.publisher.max_pending()
    }

    /// Acknowledgements waiting for the next Publish request.
    pub fn pending_acknowledgements(&self) -> usize {
        self.acknowledgements.len()
    }

    /// Last sequence number consumed for `subscription_id`.
    pub fn last_sequence_number(&self, subscription_id: u32) -> Option<u32> {
        self.sequencer.cursor(subscription_id)
    }

    /// Returns manager statistics.
    pub fn stats(&self) -> &SubscriptionManagerStats {
        &self.stats
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stops the publish loop.
    ///
    /// Outstanding Publish requests fail, no new ones are armed, and queued
    /// publish responses are dropped. A gap recovery in progress sends no
    /// further Republish or Read requests. Later operations fail with
    /// [`SubscriptionError::ManagerShutdown`].
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.publisher.shutdown();
            self.sequencer.shutdown();
            self.processing.close();
            info!(
                subscriptions = self.registry.len(),
                "Subscription manager shut down"
            );
        }
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("running", &self.running.load(Ordering::SeqCst))
            .field("subscriptions", &self.registry.len())
            .field("in_flight", &self.publisher.in_flight())
            .finish()
    }
}

// =============================================================================
// SubscriptionManagerStats
// =============================================================================

/// Statistics for the subscription manager.
#[derive(Debug, Default)]
pub struct SubscriptionManagerStats {
    subscriptions_created: AtomicU64,
    subscriptions_deleted: AtomicU64,
    total_creation_time_us: AtomicU64,
    publish_requests: AtomicU64,
    publish_responses: AtomicU64,
    publish_failures: AtomicU64,
    acknowledgements_sent: AtomicU64,
    acknowledgements_dropped: AtomicU64,
    keep_alives: AtomicU64,
    notification_messages: AtomicU64,
    gaps_detected: AtomicU64,
    messages_republished: AtomicU64,
    recovery_fallbacks: AtomicU64,
    fallback_reads: AtomicU64,
}

impl SubscriptionManagerStats {
    /// Creates new statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a subscription creation.
    pub fn record_subscription_created(&self, duration: Duration) {
        self.subscriptions_created.fetch_add(1, Ordering::Relaxed);
        self.total_creation_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Records a subscription deletion.
    pub fn record_subscription_deleted(&self) {
        self.subscriptions_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a Publish request carrying `acknowledgements`.
    pub fn record_publish_request(&self, acknowledgements: usize) {
        self.publish_requests.fetch_add(1, Ordering::Relaxed);
        self.acknowledgements_sent
            .fetch_add(acknowledgements as u64, Ordering::Relaxed);
    }

    /// Records a Publish response.
    pub fn record_publish_response(&self) {
        self.publish_responses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed Publish and the acknowledgements it dropped.
    pub fn record_publish_failure(&self, dropped_acknowledgements: usize) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
        self.acknowledgements_dropped
            .fetch_add(dropped_acknowledgements as u64, Ordering::Relaxed);
    }

    /// Records a dispatched keep-alive.
    pub fn record_keep_alive(&self) {
        self.keep_alives.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dispatched notification message.
    pub fn record_notification_message(&self) {
        self.notification_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a sequence gap.
    pub fn record_gap(&self) {
        self.gaps_detected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a republished message.
    pub fn record_republished(&self) {
        self.messages_republished.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed republish that fell back to reading values.
    pub fn record_recovery_fallback(&self) {
        self.recovery_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one fallback read.
    pub fn record_fallback_read(&self) {
        self.fallback_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns total subscriptions created.
    pub fn subscriptions_created(&self) -> u64 {
        self.subscriptions_created.load(Ordering::Relaxed)
    }

    /// Returns total subscriptions deleted.
    pub fn subscriptions_deleted(&self) -> u64 {
        self.subscriptions_deleted.load(Ordering::Relaxed)
    }

    /// Returns Publish requests sent.
    pub fn publish_requests(&self) -> u64 {
        self.publish_requests.load(Ordering::Relaxed)
    }

    /// Returns Publish responses received.
    pub fn publish_responses(&self) -> u64 {
        self.publish_responses.load(Ordering::Relaxed)
    }

    /// Returns failed Publish requests.
    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    /// Returns acknowledgements sent.
    pub fn acknowledgements_sent(&self) -> u64 {
        self.acknowledgements_sent.load(Ordering::Relaxed)
    }

    /// Returns acknowledgements lost with failed Publish requests.
    pub fn acknowledgements_dropped(&self) -> u64 {
        self.acknowledgements_dropped.load(Ordering::Relaxed)
    }

    /// Returns keep-alives dispatched.
    pub fn keep_alives(&self) -> u64 {
        self.keep_alives.load(Ordering::Relaxed)
    }

    /// Returns notification messages dispatched.
    pub fn notification_messages(&self) -> u64 {
        self.notification_messages.load(Ordering::Relaxed)
    }

    /// Returns sequence gaps detected.
    pub fn gaps_detected(&self) -> u64 {
        self.gaps_detected.load(Ordering::Relaxed)
    }

    /// Returns messages recovered through Republish.
    pub fn messages_republished(&self) -> u64 {
        self.messages_republished.load(Ordering::Relaxed)
    }

    /// Returns recoveries that fell back to reading values.
    pub fn recovery_fallbacks(&self) -> u64 {
        self.recovery_fallbacks.load(Ordering::Relaxed)
    }

    /// Returns reads issued by fallback recovery.
    pub fn fallback_reads(&self) -> u64 {
        self.fallback_reads.load(Ordering::Relaxed)
    }

    /// Returns average subscription creation time.
    pub fn average_creation_time(&self) -> Duration {
        let count = self.subscriptions_created();
        if count == 0 {
            return Duration::ZERO;
        }
        let total_us = self.total_creation_time_us.load(Ordering::Relaxed);
        Duration::from_micros(total_us / count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_recording() {
        let stats = SubscriptionManagerStats::new();
        stats.record_subscription_created(Duration::from_millis(4));
        stats.record_subscription_created(Duration::from_millis(2));
        stats.record_publish_request(3);
        stats.record_publish_request(0);
        stats.record_publish_failure(3);
        stats.record_gap();

        assert_eq!(stats.subscriptions_created(), 2);
        assert_eq!(stats.average_creation_time(), Duration::from_millis(3));
        assert_eq!(stats.publish_requests(), 2);
        assert_eq!(stats.acknowledgements_sent(), 3);
        assert_eq!(stats.acknowledgements_dropped(), 3);
        assert_eq!(stats.publish_failures(), 1);
        assert_eq!(stats.gaps_detected(), 1);
        assert_eq!(stats.fallback_reads(), 0);
    }

    #[test]
    fn test_average_creation_time_empty() {
        assert_eq!(
            SubscriptionManagerStats::new().average_creation_time(),
            Duration::ZERO
        );
    }
}
