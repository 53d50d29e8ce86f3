// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Monitored items.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::messages::{MonitoredItemCreateResult, MonitoringMode};
use crate::types::{AttributeId, DataValue, NodeId, ReadValueId, Variant};

/// Callback invoked with each value delivered to an item.
pub type ValueCallback = Arc<dyn Fn(&MonitoredItem, &DataValue) + Send + Sync>;

/// Callback invoked with each event delivered to an item.
pub type EventCallback = Arc<dyn Fn(&MonitoredItem, &[Variant]) + Send + Sync>;

// =============================================================================
// MonitoredItemRequest
// =============================================================================

/// Parameters for creating a monitored item.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemRequest {
    /// Target.
    pub item_to_monitor: ReadValueId,

    /// Monitoring mode.
    pub monitoring_mode: MonitoringMode,

    /// Requested sampling interval in milliseconds; -1 follows the
    /// publishing interval.
    pub sampling_interval: f64,

    /// Requested server queue size.
    pub queue_size: u32,

    /// Discard the oldest queued value on overflow.
    pub discard_oldest: bool,
}

impl MonitoredItemRequest {
    /// Monitors the Value attribute of `node_id`.
    pub fn value(node_id: NodeId) -> Self {
        Self {
            item_to_monitor: ReadValueId::value(node_id),
            monitoring_mode: MonitoringMode::Reporting,
            sampling_interval: -1.0,
            queue_size: 1,
            discard_oldest: true,
        }
    }

    /// Monitors events raised by `node_id`.
    pub fn events(node_id: NodeId) -> Self {
        Self {
            item_to_monitor: ReadValueId::event_notifier(node_id),
            monitoring_mode: MonitoringMode::Reporting,
            sampling_interval: 0.0,
            queue_size: 0,
            discard_oldest: true,
        }
    }

    /// Sets the sampling interval in milliseconds.
    pub fn with_sampling_interval(mut self, interval_ms: f64) -> Self {
        self.sampling_interval = interval_ms;
        self
    }

    /// Sets the queue size.
    pub fn with_queue_size(mut self, queue_size: u32) -> Self {
        self.queue_size = queue_size;
        self
    }

    /// Sets the monitoring mode.
    pub fn with_monitoring_mode(mut self, mode: MonitoringMode) -> Self {
        self.monitoring_mode = mode;
        self
    }
}

// =============================================================================
// MonitoredItem
// =============================================================================

/// A data point or event source monitored within a subscription.
///
/// Values and events arrive on the delivery queue, one at a time and in
/// sequence order. Registered callbacks run on that queue and should not
/// block.
pub struct MonitoredItem {
    client_handle: u32,
    subscription_id: u32,
    monitored_item_id: u32,
    item_to_monitor: ReadValueId,
    monitoring_mode: MonitoringMode,
    revised_sampling_interval: f64,
    revised_queue_size: u32,
    last_value: RwLock<Option<DataValue>>,
    last_event: RwLock<Option<Vec<Variant>>>,
    value_callback: RwLock<Option<ValueCallback>>,
    event_callback: RwLock<Option<EventCallback>>,
    values: broadcast::Sender<DataValue>,
    values_received: AtomicU64,
    events_received: AtomicU64,
}

impl MonitoredItem {
    pub(crate) fn new(
        subscription_id: u32,
        client_handle: u32,
        request: &MonitoredItemRequest,
        result: &MonitoredItemCreateResult,
        value_channel_capacity: usize,
    ) -> Self {
        let (values, _) = broadcast::channel(value_channel_capacity.max(1));
        Self {
            client_handle,
            subscription_id,
            monitored_item_id: result.monitored_item_id,
            item_to_monitor: request.item_to_monitor.clone(),
            monitoring_mode: request.monitoring_mode,
            revised_sampling_interval: result.revised_sampling_interval,
            revised_queue_size: result.revised_queue_size,
            last_value: RwLock::new(None),
            last_event: RwLock::new(None),
            value_callback: RwLock::new(None),
            event_callback: RwLock::new(None),
            values,
            values_received: AtomicU64::new(0),
            events_received: AtomicU64::new(0),
        }
    }

    /// Client-assigned handle used to route notifications.
    pub fn client_handle(&self) -> u32 {
        self.client_handle
    }

    /// Owning subscription.
    pub fn subscription_id(&self) -> u32 {
        self.subscription_id
    }

    /// Server-assigned id.
    pub fn monitored_item_id(&self) -> u32 {
        self.monitored_item_id
    }

    /// Monitored target.
    pub fn read_value_id(&self) -> &ReadValueId {
        &self.item_to_monitor
    }

    /// Monitored node.
    pub fn node_id(&self) -> &NodeId {
        &self.item_to_monitor.node_id
    }

    /// Returns `true` if this item monitors events rather than values.
    pub fn is_event_item(&self) -> bool {
        self.item_to_monitor.attribute_id == AttributeId::EventNotifier
    }

    /// Monitoring mode.
    pub fn monitoring_mode(&self) -> MonitoringMode {
        self.monitoring_mode
    }

    /// Sampling interval revised by the server, in milliseconds.
    pub fn revised_sampling_interval(&self) -> f64 {
        self.revised_sampling_interval
    }

    /// Queue size revised by the server.
    pub fn revised_queue_size(&self) -> u32 {
        self.revised_queue_size
    }

    /// Registers the callback invoked for each delivered value.
    ///
    /// Replaces any previously registered value callback.
    pub fn on_value_arrived<F>(&self, callback: F)
    where
        F: Fn(&MonitoredItem, &DataValue) + Send + Sync + 'static,
    {
        *self.value_callback.write() = Some(Arc::new(callback));
    }

    /// Registers the callback invoked for each delivered event.
    ///
    /// Replaces any previously registered event callback.
    pub fn on_event_arrived<F>(&self, callback: F)
    where
        F: Fn(&MonitoredItem, &[Variant]) + Send + Sync + 'static,
    {
        *self.event_callback.write() = Some(Arc::new(callback));
    }

    /// Subscribes to delivered values.
    ///
    /// A receiver that falls more than the configured channel capacity
    /// behind observes `RecvError::Lagged` and skips ahead.
    pub fn watch_values(&self) -> broadcast::Receiver<DataValue> {
        self.values.subscribe()
    }

    /// Most recently delivered value.
    pub fn last_value(&self) -> Option<DataValue> {
        self.last_value.read().clone()
    }

    /// Most recently delivered event fields.
    pub fn last_event(&self) -> Option<Vec<Variant>> {
        self.last_event.read().clone()
    }

    /// Number of values delivered.
    pub fn values_received(&self) -> u64 {
        self.values_received.load(Ordering::Relaxed)
    }

    /// Number of events delivered.
    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    pub(crate) fn deliver_value(&self, value: DataValue) {
        self.values_received.fetch_add(1, Ordering::Relaxed);
        *self.last_value.write() = Some(value.clone());

        let callback = self.value_callback.read().clone();
        if let Some(callback) = callback {
            callback(self, &value);
        }

        let _ = self.values.send(value);
    }

    pub(crate) fn deliver_event(&self, fields: Vec<Variant>) {
        self.events_received.fetch_add(1, Ordering::Relaxed);

        let callback = self.event_callback.read().clone();
        if let Some(callback) = callback {
            callback(self, &fields);
        }

        *self.last_event.write() = Some(fields);
    }
}

impl fmt::Debug for MonitoredItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitoredItem")
            .field("client_handle", &self.client_handle)
            .field("monitored_item_id", &self.monitored_item_id)
            .field("node_id", &self.item_to_monitor.node_id)
            .field("attribute_id", &self.item_to_monitor.attribute_id)
            .finish()
    }
}
