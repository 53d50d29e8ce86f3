// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscriptions, the publish loop and notification delivery.
//!
//! # Flow
//!
//! ```text
//!   SubscriptionManager ──create/modify/delete──▶ SubscriptionRegistry
//!          │                                             │
//!          │ reassess                                    │ count, keep-alive
//!          ▼                                             ▼
//!   ┌─────────────┐   Publish(acks)    ┌────────────────────────┐
//!   │  Publisher  │ ─────────────────▶ │   SessionClient        │
//!   └─────────────┘ ◀───────────────── └────────────────────────┘
//!          │           PublishResponse
//!          ▼
//!   [processing queue] ──▶ Sequencer ── gap ──▶ Republish / Read
//!                              │ acks ──▶ PendingAcknowledgements
//!                              ▼
//!   [delivery queue]   ──▶ Dispatcher ──▶ MonitoredItem callbacks
//!                                     └─▶ SubscriptionListener
//! ```
//!
//! Both queues run one task at a time, in submission order. A sequence gap
//! pauses both until recovery finishes, so items never observe values out
//! of order.
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = client.subscription_manager();
//! let subscription = manager.create_subscription_with_interval(1000.0).await?;
//!
//! let items = manager
//!     .create_monitored_items(
//!         &subscription,
//!         vec![MonitoredItemRequest::value(NodeId::numeric(2, 1001))],
//!     )
//!     .await?;
//!
//! if let Some(Ok(item)) = items.first() {
//!     item.on_value_arrived(|item, value| {
//!         println!("{} = {}", item.node_id(), value.value);
//!     });
//! }
//! ```

mod dispatch;
mod item;
mod manager;
mod model;
mod publish;
mod registry;
mod sequencing;

pub use dispatch::SubscriptionListener;
pub use item::{EventCallback, MonitoredItem, MonitoredItemRequest, ValueCallback};
pub use manager::{SubscriptionManager, SubscriptionManagerStats};
pub use model::{keep_alive_count_for, SubscriptionParameters, UaSubscription};
pub use registry::SubscriptionRegistry;
pub use sequencing::{next_sequence_number, previous_sequence_number, sequence_greater_than};
