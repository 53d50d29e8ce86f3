// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Notification dispatch.
//!
//! Runs on the delivery queue, one notification message at a time. Each
//! element of a message is routed by kind:
//!
//! | Element        | Destination                                  |
//! |----------------|----------------------------------------------|
//! | DataChange     | item value callback, by client handle        |
//! | Events         | item event callback, by client handle        |
//! | StatusChange   | log + [`SubscriptionListener::on_status_changed`] |
//! | (keep-alive)   | [`SubscriptionListener::on_keep_alive`]      |
//! | Unknown        | logged and skipped                           |
//!
//! Notifications for client handles that are not registered (for example
//! an item deleted while its notification was in flight) are dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{info, trace, warn};

use crate::messages::{NotificationData, NotificationMessage};
use crate::types::StatusCode;

use super::manager::SubscriptionManagerStats;
use super::model::UaSubscription;
use super::registry::SubscriptionRegistry;

/// Observer of subscription-level notifications.
///
/// Callbacks run on the delivery queue and should not block.
pub trait SubscriptionListener: Send + Sync {
    /// A keep-alive arrived for `subscription`.
    fn on_keep_alive(&self, _subscription: &UaSubscription, _publish_time: DateTime<Utc>) {}

    /// The server reported a status change for `subscription`.
    fn on_status_changed(&self, _subscription: &UaSubscription, _status: StatusCode) {}

    /// A notification message was dispatched for `subscription`.
    fn on_notification_message(&self, _subscription: &UaSubscription, _sequence_number: u32) {}
}

/// Routes notification messages to monitored items and listeners.
pub(crate) struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
    listeners: RwLock<Vec<Arc<dyn SubscriptionListener>>>,
    stats: Arc<SubscriptionManagerStats>,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<SubscriptionRegistry>,
        stats: Arc<SubscriptionManagerStats>,
    ) -> Self {
        Self {
            registry,
            listeners: RwLock::new(Vec::new()),
            stats,
        }
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn SubscriptionListener>) {
        self.listeners.write().push(listener);
    }

    fn listeners(&self) -> Vec<Arc<dyn SubscriptionListener>> {
        self.listeners.read().clone()
    }

    pub(crate) fn dispatch(&self, subscription_id: u32, message: &NotificationMessage) {
        let Some(subscription) = self.registry.get(subscription_id) else {
            trace!(
                subscription_id,
                sequence_number = message.sequence_number,
                "Notification for unknown subscription dropped"
            );
            return;
        };

        if message.is_keep_alive() {
            subscription.record_keep_alive();
            self.stats.record_keep_alive();
            trace!(subscription_id, "Keep-alive");
            for listener in self.listeners() {
                listener.on_keep_alive(&subscription, message.publish_time);
            }
            return;
        }

        subscription.record_notification_message();
        self.stats.record_notification_message();

        for data in &message.notification_data {
            match data {
                NotificationData::DataChange(notifications) => {
                    for notification in notifications {
                        match subscription.item(notification.client_handle) {
                            Some(item) => item.deliver_value(notification.value.clone()),
                            None => trace!(
                                subscription_id,
                                client_handle = notification.client_handle,
                                "Value for unknown item dropped"
                            ),
                        }
                    }
                }
                NotificationData::Events(events) => {
                    for event in events {
                        match subscription.item(event.client_handle) {
                            Some(item) => item.deliver_event(event.event_fields.clone()),
                            None => trace!(
                                subscription_id,
                                client_handle = event.client_handle,
                                "Event for unknown item dropped"
                            ),
                        }
                    }
                }
                NotificationData::StatusChange(status) => {
                    info!(subscription_id, status = %status, "Subscription status changed");
                    for listener in self.listeners() {
                        listener.on_status_changed(&subscription, *status);
                    }
                }
                NotificationData::Unknown { type_id } => {
                    warn!(
                        subscription_id,
                        type_id = %type_id,
                        "Skipping undecodable notification data"
                    );
                }
            }
        }

        for listener in self.listeners() {
            listener.on_notification_message(&subscription, message.sequence_number);
        }
    }
}
