// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client session lifecycle and subscription publish engine.
//!
//! This crate implements the client-side runtime that sits between an
//! application and a secure-channel transport:
//!
//! - a session state machine (create, activate, close, invalidate)
//! - a subscription registry with monitored items
//! - a pipelined publish loop with piggy-backed acknowledgements
//! - sequence tracking with Republish and read-back recovery
//! - ordered notification dispatch to item callbacks and listeners
//!
//! The transport is a port: implement [`UaTransport`] over any secure
//! channel and hand it to [`UaClient::connect`].
//!
//! # Error Handling
//!
//! ```text
//! UaError
//! ├── Transport     - Channel failures, unexpected responses
//! ├── Service       - Bad service results from the server
//! ├── Session       - Session creation, activation and invalidation
//! ├── Subscription  - Subscription and monitored item errors
//! ├── Sequence      - Republish mismatches and failed recovery
//! ├── Configuration - Invalid settings
//! └── Timeout       - Requests exceeding the request timeout
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use uasub_client::{ClientConfig, MonitoredItemRequest, NodeId, UaClient};
//!
//! let config = ClientConfig::builder()
//!     .application_name("Line 4 Monitor")
//!     .build()?;
//!
//! let client = UaClient::connect(Arc::new(transport), config).await?;
//! let manager = client.subscription_manager();
//!
//! let subscription = manager.create_subscription_with_interval(500.0).await?;
//! manager
//!     .create_monitored_items(
//!         &subscription,
//!         vec![MonitoredItemRequest::value(NodeId::string(2, "Line4.Speed"))],
//!     )
//!     .await?;
//!
//! client.disconnect().await;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod execution_queue;
pub mod messages;
pub mod session;
pub mod subscription;
pub mod transport;
pub mod types;

pub use error::{
    ConfigurationError, ErrorCode, ErrorSeverity, SequenceError, ServiceError, SessionError,
    SubscriptionError, TimeoutError, TransportError, UaError, UaResult,
};

pub use types::{
    ApplicationDescription, ApplicationType, AttributeId, DataValue, EndpointDescription, NodeId,
    NodeIdentifier, ReadValueId, SecurityMode, SecurityPolicy, StatusCode, TimestampsToReturn,
    Variant, WriteValue,
};

pub use config::{ClientConfig, ClientConfigBuilder, UserIdentity};

pub use transport::{TransportExt, UaTransport};

pub use client::{AttributeStore, SessionClient, UaClient};

pub use execution_queue::{ExecutionQueue, PauseGuard};

pub use session::{SessionEvent, SessionFsm, SessionState, SessionStateKind, SessionStats, UaSession};

pub use subscription::{
    MonitoredItem, MonitoredItemRequest, SubscriptionListener, SubscriptionManager,
    SubscriptionManagerStats, SubscriptionParameters, SubscriptionRegistry, UaSubscription,
};
