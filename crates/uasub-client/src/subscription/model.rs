// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_NOTIFICATIONS_PER_PUBLISH;
use crate::error::{SubscriptionError, UaResult};

use super::item::MonitoredItem;

/// Keep-alive period targeted by [`SubscriptionParameters::with_interval`].
const TARGET_KEEP_ALIVE_MS: f64 = 10_000.0;

/// Smallest lifetime count relative to the keep-alive count.
const LIFETIME_TO_KEEP_ALIVE_RATIO: u32 = 3;

// =============================================================================
// SubscriptionParameters
// =============================================================================

/// Subscription parameters, requested or revised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionParameters {
    /// Publishing interval in milliseconds.
    pub publishing_interval: f64,

    /// Publishing cycles without a Publish request before the server drops
    /// the subscription.
    pub lifetime_count: u32,

    /// Publishing cycles without notifications before a keep-alive is sent.
    pub max_keep_alive_count: u32,

    /// Maximum notifications per publish response, 0 for no limit.
    pub max_notifications_per_publish: u32,

    /// Publishing enabled.
    pub publishing_enabled: bool,

    /// Relative priority.
    pub priority: u8,
}

impl SubscriptionParameters {
    /// Derives parameters from a publishing interval alone.
    ///
    /// The keep-alive count targets a keep-alive about every ten seconds and
    /// is at least 1; the lifetime count is three keep-alive periods.
    pub fn with_interval(publishing_interval: f64) -> Self {
        let max_keep_alive_count = keep_alive_count_for(publishing_interval);
        Self {
            publishing_interval,
            lifetime_count: max_keep_alive_count.saturating_mul(LIFETIME_TO_KEEP_ALIVE_RATIO),
            max_keep_alive_count,
            max_notifications_per_publish: DEFAULT_MAX_NOTIFICATIONS_PER_PUBLISH,
            publishing_enabled: true,
            priority: 0,
        }
    }

    /// Sets the maximum notifications per publish.
    pub fn with_max_notifications(mut self, max: u32) -> Self {
        self.max_notifications_per_publish = max;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Sets whether publishing starts enabled.
    pub fn with_publishing_enabled(mut self, enabled: bool) -> Self {
        self.publishing_enabled = enabled;
        self
    }

    /// Validates the requested values.
    pub fn validate(&self) -> UaResult<()> {
        if !self.publishing_interval.is_finite() || self.publishing_interval <= 0.0 {
            return Err(SubscriptionError::invalid_parameters(format!(
                "publishing interval must be a positive number of milliseconds, got {}",
                self.publishing_interval
            ))
            .into());
        }
        if self.max_keep_alive_count == 0 {
            return Err(
                SubscriptionError::invalid_parameters("max keep-alive count must be at least 1")
                    .into(),
            );
        }
        if self.lifetime_count == 0 {
            return Err(
                SubscriptionError::invalid_parameters("lifetime count must be at least 1").into(),
            );
        }
        Ok(())
    }

    /// Time between keep-alives, in milliseconds.
    pub fn keep_alive_period_ms(&self) -> f64 {
        self.publishing_interval * f64::from(self.max_keep_alive_count)
    }
}

/// Keep-alive count for `publishing_interval` ms: `max(1, ceil(10000 / interval))`.
pub fn keep_alive_count_for(publishing_interval: f64) -> u32 {
    let count = (TARGET_KEEP_ALIVE_MS / publishing_interval).ceil();
    if count.is_finite() && count >= 1.0 {
        // Float to int casts saturate.
        count as u32
    } else {
        1
    }
}

// =============================================================================
// UaSubscription
// =============================================================================

/// A subscription registered with the server.
///
/// Parameters hold the values revised by the server and are updated in
/// place by modify; the subscription's identity never changes.
pub struct UaSubscription {
    subscription_id: u32,
    parameters: RwLock<SubscriptionParameters>,
    items: RwLock<BTreeMap<u32, Arc<MonitoredItem>>>,
    created_at: DateTime<Utc>,
    notification_messages: AtomicU64,
    keep_alives: AtomicU64,
}

impl UaSubscription {
    pub(crate) fn new(subscription_id: u32, parameters: SubscriptionParameters) -> Self {
        Self {
            subscription_id,
            parameters: RwLock::new(parameters),
            items: RwLock::new(BTreeMap::new()),
            created_at: Utc::now(),
            notification_messages: AtomicU64::new(0),
            keep_alives: AtomicU64::new(0),
        }
    }

    /// Server-assigned id.
    pub fn subscription_id(&self) -> u32 {
        self.subscription_id
    }

    /// Snapshot of the current parameters.
    pub fn parameters(&self) -> SubscriptionParameters {
        *self.parameters.read()
    }

    /// Revised publishing interval in milliseconds.
    pub fn publishing_interval(&self) -> f64 {
        self.parameters.read().publishing_interval
    }

    /// Revised publishing interval.
    pub fn publishing_interval_duration(&self) -> Duration {
        let ms = self.publishing_interval();
        if ms.is_finite() && ms > 0.0 {
            Duration::from_secs_f64(ms / 1000.0)
        } else {
            Duration::ZERO
        }
    }

    /// Revised lifetime count.
    pub fn lifetime_count(&self) -> u32 {
        self.parameters.read().lifetime_count
    }

    /// Revised max keep-alive count.
    pub fn max_keep_alive_count(&self) -> u32 {
        self.parameters.read().max_keep_alive_count
    }

    /// Maximum notifications per publish response.
    pub fn max_notifications_per_publish(&self) -> u32 {
        self.parameters.read().max_notifications_per_publish
    }

    /// Publishing enabled.
    pub fn publishing_enabled(&self) -> bool {
        self.parameters.read().publishing_enabled
    }

    /// Priority.
    pub fn priority(&self) -> u8 {
        self.parameters.read().priority
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Item with `client_handle`.
    pub fn item(&self, client_handle: u32) -> Option<Arc<MonitoredItem>> {
        self.items.read().get(&client_handle).cloned()
    }

    /// All items, ordered by client handle.
    pub fn items(&self) -> Vec<Arc<MonitoredItem>> {
        self.items.read().values().cloned().collect()
    }

    /// Number of items.
    pub fn item_count(&self) -> usize {
        self.items.read().len()
    }

    /// Notification messages dispatched to this subscription.
    pub fn notification_messages(&self) -> u64 {
        self.notification_messages.load(Ordering::Relaxed)
    }

    /// Keep-alives received for this subscription.
    pub fn keep_alives(&self) -> u64 {
        self.keep_alives.load(Ordering::Relaxed)
    }

    pub(crate) fn apply_revised(
        &self,
        publishing_interval: f64,
        lifetime_count: u32,
        max_keep_alive_count: u32,
        requested: &SubscriptionParameters,
    ) {
        let mut parameters = self.parameters.write();
        parameters.publishing_interval = publishing_interval;
        parameters.lifetime_count = lifetime_count;
        parameters.max_keep_alive_count = max_keep_alive_count;
        parameters.max_notifications_per_publish = requested.max_notifications_per_publish;
        parameters.priority = requested.priority;
    }

    pub(crate) fn set_publishing_enabled(&self, enabled: bool) {
        self.parameters.write().publishing_enabled = enabled;
    }

    pub(crate) fn insert_item(&self, item: Arc<MonitoredItem>) {
        self.items.write().insert(item.client_handle(), item);
    }

    pub(crate) fn remove_item(&self, client_handle: u32) -> Option<Arc<MonitoredItem>> {
        self.items.write().remove(&client_handle)
    }

    pub(crate) fn record_notification_message(&self) {
        self.notification_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_keep_alive(&self) {
        self.keep_alives.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for UaSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UaSubscription")
            .field("subscription_id", &self.subscription_id)
            .field("parameters", &*self.parameters.read())
            .field("items", &self.item_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_derivation() {
        let params = SubscriptionParameters::with_interval(1000.0);
        assert_eq!(params.max_keep_alive_count, 10);
        assert_eq!(params.lifetime_count, 30);
        assert_eq!(params.max_notifications_per_publish, 65535);
        assert!(params.publishing_enabled);
        assert_eq!(params.priority, 0);

        let params = SubscriptionParameters::with_interval(20_000.0);
        assert_eq!(params.max_keep_alive_count, 1);
        assert_eq!(params.lifetime_count, 3);
    }

    #[test]
    fn test_keep_alive_count_rounds_up() {
        assert_eq!(keep_alive_count_for(3000.0), 4);
        assert_eq!(keep_alive_count_for(10_000.0), 1);
        assert_eq!(keep_alive_count_for(0.5), 20_000);
        assert_eq!(keep_alive_count_for(f64::NAN), 1);
    }

    #[test]
    fn test_validate() {
        assert!(SubscriptionParameters::with_interval(500.0).validate().is_ok());
        assert!(SubscriptionParameters::with_interval(0.0).validate().is_err());
        assert!(SubscriptionParameters::with_interval(-5.0).validate().is_err());

        let mut params = SubscriptionParameters::with_interval(500.0);
        params.max_keep_alive_count = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_apply_revised_keeps_identity() {
        let subscription = UaSubscription::new(12, SubscriptionParameters::with_interval(1000.0));
        let requested = SubscriptionParameters::with_interval(250.0).with_priority(4);

        subscription.apply_revised(500.0, 60, 20, &requested);

        assert_eq!(subscription.subscription_id(), 12);
        assert_eq!(subscription.publishing_interval(), 500.0);
        assert_eq!(subscription.lifetime_count(), 60);
        assert_eq!(subscription.max_keep_alive_count(), 20);
        assert_eq!(subscription.priority(), 4);
        assert_eq!(
            subscription.publishing_interval_duration(),
            Duration::from_millis(500)
        );
    }
}
