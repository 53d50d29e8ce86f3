// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription registry.

use std::sync::Arc;

use dashmap::DashMap;

use super::model::UaSubscription;

/// Live subscriptions keyed by server-assigned id.
///
/// Insert and remove are the only exclusive operations; lookups and
/// iteration run concurrently with them.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: DashMap<u32, Arc<UaSubscription>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `subscription`, replacing any entry with the same id.
    pub fn insert(&self, subscription: Arc<UaSubscription>) {
        self.subscriptions
            .insert(subscription.subscription_id(), subscription);
    }

    /// Removes and returns the subscription with `subscription_id`.
    pub fn remove(&self, subscription_id: u32) -> Option<Arc<UaSubscription>> {
        self.subscriptions
            .remove(&subscription_id)
            .map(|(_, subscription)| subscription)
    }

    /// Looks up a subscription.
    pub fn get(&self, subscription_id: u32) -> Option<Arc<UaSubscription>> {
        self.subscriptions
            .get(&subscription_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns `true` if `subscription_id` is registered.
    pub fn contains(&self, subscription_id: u32) -> bool {
        self.subscriptions.contains_key(&subscription_id)
    }

    /// Number of subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns `true` if no subscriptions are registered.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Snapshot of all subscriptions, ordered by id.
    pub fn subscriptions(&self) -> Vec<Arc<UaSubscription>> {
        let mut all: Vec<_> = self
            .subscriptions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by_key(|subscription| subscription.subscription_id());
        all
    }

    /// Shortest keep-alive period across all subscriptions, in milliseconds.
    pub fn min_keep_alive_period_ms(&self) -> Option<f64> {
        self.subscriptions
            .iter()
            .map(|entry| entry.value().parameters().keep_alive_period_ms())
            .filter(|period| period.is_finite())
            .reduce(f64::min)
    }
}
