// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Typed service requests and responses.
//!
//! Wire encoding belongs to the transport. This module only defines the
//! decoded shape of every service the session and subscription layers use,
//! plus the [`RequestMessage`] / [`ResponseMessage`] envelopes that cross the
//! [`UaTransport`](crate::transport::UaTransport) boundary.
//!
//! Each request type implements [`ServiceRequest`], which ties it to its
//! response type so callers can write `transport.send(request).await` and
//! get the matching response back.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::UserIdentity;
use crate::error::{TransportError, UaError, UaResult};
use crate::types::{
    ApplicationDescription, DataValue, EndpointDescription, NodeId, ReadValueId, StatusCode,
    TimestampsToReturn, Variant, WriteValue,
};

// =============================================================================
// Headers
// =============================================================================

/// Header carried by every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Session authentication token; null before a session exists.
    pub authentication_token: NodeId,

    /// Time the request was issued.
    pub timestamp: DateTime<Utc>,

    /// Client-assigned handle echoed in the response.
    pub request_handle: u32,

    /// Requested diagnostics mask.
    pub return_diagnostics: u32,

    /// Audit log entry id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_entry_id: Option<String>,

    /// Advisory timeout for the server, in milliseconds.
    pub timeout_hint: u32,
}

impl RequestHeader {
    /// Creates a header.
    pub fn new(authentication_token: NodeId, request_handle: u32, timeout_hint: u32) -> Self {
        Self {
            authentication_token,
            timestamp: Utc::now(),
            request_handle,
            return_diagnostics: 0,
            audit_entry_id: None,
            timeout_hint,
        }
    }
}

/// Converts a duration to a header timeout hint, saturating at `u32::MAX` ms.
pub fn timeout_hint_millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// Source of request handles.
///
/// Handles increase monotonically and wrap back to 1; 0 is never issued.
#[derive(Debug)]
pub struct RequestHandles {
    next: AtomicU32,
}

impl RequestHandles {
    /// Creates a generator starting at 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    /// Returns the next handle.
    pub fn next(&self) -> u32 {
        loop {
            let handle = self.next.fetch_add(1, Ordering::Relaxed);
            if handle != 0 {
                return handle;
            }
        }
    }
}

impl Default for RequestHandles {
    fn default() -> Self {
        Self::new()
    }
}

/// Header carried by every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Time the response was sent.
    pub timestamp: DateTime<Utc>,

    /// Handle from the matching request.
    pub request_handle: u32,

    /// Result of the service call as a whole.
    pub service_result: StatusCode,
}

impl ResponseHeader {
    /// Creates a good response header for `request_handle`.
    pub fn good(request_handle: u32) -> Self {
        Self::with_status(request_handle, StatusCode::GOOD)
    }

    /// Creates a response header with `service_result`.
    pub fn with_status(request_handle: u32, service_result: StatusCode) -> Self {
        Self {
            timestamp: Utc::now(),
            request_handle,
            service_result,
        }
    }
}

// =============================================================================
// Session services
// =============================================================================

/// CreateSession request.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSessionRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Client application description.
    pub client_description: ApplicationDescription,
    /// Server URI; only set when the server is reached through a gateway.
    pub server_uri: Option<String>,
    /// Endpoint URL the channel is connected to.
    pub endpoint_url: String,
    /// Human-readable session name.
    pub session_name: String,
    /// Client nonce.
    pub client_nonce: Vec<u8>,
    /// Client certificate (DER), empty when unavailable.
    pub client_certificate: Vec<u8>,
    /// Requested session timeout in milliseconds.
    pub requested_session_timeout: f64,
    /// Largest response the client accepts, 0 for no limit.
    pub max_response_message_size: u32,
}

/// CreateSession response.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSessionResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// Server-assigned session id.
    pub session_id: NodeId,
    /// Secret token used in every subsequent request header.
    pub authentication_token: NodeId,
    /// Revised session timeout in milliseconds.
    pub revised_session_timeout: f64,
    /// Server nonce.
    pub server_nonce: Vec<u8>,
    /// Server certificate.
    pub server_certificate: Vec<u8>,
    /// Endpoints offered by the server.
    pub server_endpoints: Vec<EndpointDescription>,
    /// Largest request the server accepts, 0 for no limit.
    pub max_request_message_size: u32,
}

/// ActivateSession request.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivateSessionRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Preferred locales.
    pub locale_ids: Vec<String>,
    /// User identity presented to the server.
    pub user_identity_token: UserIdentity,
}

/// ActivateSession response.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivateSessionResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// Fresh server nonce.
    pub server_nonce: Vec<u8>,
    /// Per software certificate results.
    pub results: Vec<StatusCode>,
}

/// CloseSession request.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseSessionRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Delete the session's subscriptions along with it.
    pub delete_subscriptions: bool,
}

/// CloseSession response.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseSessionResponse {
    /// Response header.
    pub response_header: ResponseHeader,
}

// =============================================================================
// Attribute services
// =============================================================================

/// Read request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Maximum age of cached values in milliseconds; 0 forces a device read.
    pub max_age: f64,
    /// Timestamps to return.
    pub timestamps_to_return: TimestampsToReturn,
    /// Targets.
    pub nodes_to_read: Vec<ReadValueId>,
}

/// Read response.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One value per target, in request order.
    pub results: Vec<DataValue>,
}

/// Write request.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Writes.
    pub nodes_to_write: Vec<WriteValue>,
}

/// Write response.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One status per write, in request order.
    pub results: Vec<StatusCode>,
}

// =============================================================================
// Subscription services
// =============================================================================

/// CreateSubscription request.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSubscriptionRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Requested publishing interval in milliseconds.
    pub requested_publishing_interval: f64,
    /// Requested lifetime count.
    pub requested_lifetime_count: u32,
    /// Requested max keep-alive count.
    pub requested_max_keep_alive_count: u32,
    /// Maximum notifications per publish response.
    pub max_notifications_per_publish: u32,
    /// Publishing enabled.
    pub publishing_enabled: bool,
    /// Relative priority.
    pub priority: u8,
}

/// CreateSubscription response.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSubscriptionResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// Server-assigned subscription id.
    pub subscription_id: u32,
    /// Revised publishing interval in milliseconds.
    pub revised_publishing_interval: f64,
    /// Revised lifetime count.
    pub revised_lifetime_count: u32,
    /// Revised max keep-alive count.
    pub revised_max_keep_alive_count: u32,
}

/// ModifySubscription request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifySubscriptionRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Subscription to modify.
    pub subscription_id: u32,
    /// Requested publishing interval in milliseconds.
    pub requested_publishing_interval: f64,
    /// Requested lifetime count.
    pub requested_lifetime_count: u32,
    /// Requested max keep-alive count.
    pub requested_max_keep_alive_count: u32,
    /// Maximum notifications per publish response.
    pub max_notifications_per_publish: u32,
    /// Relative priority.
    pub priority: u8,
}

/// ModifySubscription response.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifySubscriptionResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// Revised publishing interval in milliseconds.
    pub revised_publishing_interval: f64,
    /// Revised lifetime count.
    pub revised_lifetime_count: u32,
    /// Revised max keep-alive count.
    pub revised_max_keep_alive_count: u32,
}

/// SetPublishingMode request.
#[derive(Debug, Clone, PartialEq)]
pub struct SetPublishingModeRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// New publishing state.
    pub publishing_enabled: bool,
    /// Subscriptions to update.
    pub subscription_ids: Vec<u32>,
}

/// SetPublishingMode response.
#[derive(Debug, Clone, PartialEq)]
pub struct SetPublishingModeResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One status per subscription.
    pub results: Vec<StatusCode>,
}

/// DeleteSubscriptions request.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteSubscriptionsRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Subscriptions to delete.
    pub subscription_ids: Vec<u32>,
}

/// DeleteSubscriptions response.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteSubscriptionsResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One status per subscription.
    pub results: Vec<StatusCode>,
}

// =============================================================================
// Monitored item services
// =============================================================================

/// Monitoring mode of a monitored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringMode {
    /// Sampling and reporting disabled.
    Disabled,
    /// Sampling without reporting.
    Sampling,
    /// Sampling and reporting.
    #[default]
    Reporting,
}

/// Requested monitoring parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringParameters {
    /// Client handle used to route notifications.
    pub client_handle: u32,
    /// Sampling interval in milliseconds; negative uses the publishing interval.
    pub sampling_interval: f64,
    /// Server queue size.
    pub queue_size: u32,
    /// Discard oldest value when the queue overflows.
    pub discard_oldest: bool,
}

/// One monitored item to create.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemCreateRequest {
    /// Target.
    pub item_to_monitor: ReadValueId,
    /// Monitoring mode.
    pub monitoring_mode: MonitoringMode,
    /// Parameters.
    pub requested_parameters: MonitoringParameters,
}

/// Result of creating one monitored item.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemCreateResult {
    /// Status.
    pub status_code: StatusCode,
    /// Server-assigned id.
    pub monitored_item_id: u32,
    /// Revised sampling interval in milliseconds.
    pub revised_sampling_interval: f64,
    /// Revised queue size.
    pub revised_queue_size: u32,
}

/// CreateMonitoredItems request.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMonitoredItemsRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Owning subscription.
    pub subscription_id: u32,
    /// Timestamps to return.
    pub timestamps_to_return: TimestampsToReturn,
    /// Items to create.
    pub items_to_create: Vec<MonitoredItemCreateRequest>,
}

/// CreateMonitoredItems response.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMonitoredItemsResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One result per item, in request order.
    pub results: Vec<MonitoredItemCreateResult>,
}

/// DeleteMonitoredItems request.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteMonitoredItemsRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Owning subscription.
    pub subscription_id: u32,
    /// Server ids of the items to delete.
    pub monitored_item_ids: Vec<u32>,
}

/// DeleteMonitoredItems response.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteMonitoredItemsResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// One status per item.
    pub results: Vec<StatusCode>,
}

// =============================================================================
// Publish services
// =============================================================================

/// Acknowledges receipt of one notification message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionAcknowledgement {
    /// Subscription id.
    pub subscription_id: u32,
    /// Sequence number being acknowledged.
    pub sequence_number: u32,
}

impl SubscriptionAcknowledgement {
    /// Creates an acknowledgement.
    pub const fn new(subscription_id: u32, sequence_number: u32) -> Self {
        Self {
            subscription_id,
            sequence_number,
        }
    }
}

/// A value change for one monitored item.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemNotification {
    /// Client handle of the item.
    pub client_handle: u32,
    /// New value.
    pub value: DataValue,
}

/// An event for one monitored item.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFieldList {
    /// Client handle of the item.
    pub client_handle: u32,
    /// Selected event fields, in select-clause order.
    pub event_fields: Vec<Variant>,
}

/// One element of a notification message.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationData {
    /// Value changes.
    DataChange(Vec<MonitoredItemNotification>),
    /// Events.
    Events(Vec<EventFieldList>),
    /// Subscription status change.
    StatusChange(StatusCode),
    /// Payload the transport could not decode.
    Unknown {
        /// Encoding id of the undecoded payload.
        type_id: NodeId,
    },
}

/// A notification message delivered by Publish or Republish.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    /// Sequence number of this message.
    pub sequence_number: u32,
    /// Time the message was sent.
    pub publish_time: DateTime<Utc>,
    /// Notifications; empty for a keep-alive.
    pub notification_data: Vec<NotificationData>,
}

impl NotificationMessage {
    /// Creates a message.
    pub fn new(sequence_number: u32, notification_data: Vec<NotificationData>) -> Self {
        Self {
            sequence_number,
            publish_time: Utc::now(),
            notification_data,
        }
    }

    /// Creates a keep-alive, which carries the next sequence number to be used.
    pub fn keep_alive(next_sequence_number: u32) -> Self {
        Self::new(next_sequence_number, Vec::new())
    }

    /// Returns `true` if this message carries no notifications.
    #[inline]
    pub fn is_keep_alive(&self) -> bool {
        self.notification_data.is_empty()
    }
}

/// Publish request.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Acknowledgements piggy-backed on this request.
    pub subscription_acknowledgements: Vec<SubscriptionAcknowledgement>,
}

/// Publish response.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// Subscription this message belongs to.
    pub subscription_id: u32,
    /// Sequence numbers still held in the server's retransmission queue.
    pub available_sequence_numbers: Vec<u32>,
    /// More notifications are waiting.
    pub more_notifications: bool,
    /// The message.
    pub notification_message: NotificationMessage,
    /// One status per acknowledgement in the request.
    pub results: Vec<StatusCode>,
}

/// Republish request.
#[derive(Debug, Clone, PartialEq)]
pub struct RepublishRequest {
    /// Request header.
    pub request_header: RequestHeader,
    /// Subscription.
    pub subscription_id: u32,
    /// Sequence number to retransmit.
    pub retransmit_sequence_number: u32,
}

/// Republish response.
#[derive(Debug, Clone, PartialEq)]
pub struct RepublishResponse {
    /// Response header.
    pub response_header: ResponseHeader,
    /// The retransmitted message.
    pub notification_message: NotificationMessage,
}

// =============================================================================
// Envelopes
// =============================================================================

/// Ties a request type to its response type.
pub trait ServiceRequest: Send + Sized + 'static {
    /// Matching response type.
    type Response: Send + 'static;

    /// Service name, used in logs and errors.
    const SERVICE: &'static str;

    /// Wraps this request in the transport envelope.
    fn into_message(self) -> RequestMessage;

    /// Unwraps the matching response from the transport envelope.
    fn response_from(message: ResponseMessage) -> UaResult<Self::Response>;
}

macro_rules! services {
    ($($service:ident => $request:ident, $response:ident;)*) => {
        /// Any request that can be sent through the transport.
        #[derive(Debug, Clone, PartialEq)]
        pub enum RequestMessage {
            $(
                #[doc = concat!(stringify!($service), " request.")]
                $service($request),
            )*
        }

        /// Any response that can be received through the transport.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ResponseMessage {
            $(
                #[doc = concat!(stringify!($service), " response.")]
                $service($response),
            )*
        }

        impl RequestMessage {
            /// Returns the service name.
            pub fn service_name(&self) -> &'static str {
                match self {
                    $(Self::$service(_) => stringify!($service),)*
                }
            }

            /// Returns the request header.
            pub fn request_header(&self) -> &RequestHeader {
                match self {
                    $(Self::$service(r) => &r.request_header,)*
                }
            }
        }

        impl ResponseMessage {
            /// Returns the service name.
            pub fn service_name(&self) -> &'static str {
                match self {
                    $(Self::$service(_) => stringify!($service),)*
                }
            }

            /// Returns the response header.
            pub fn response_header(&self) -> &ResponseHeader {
                match self {
                    $(Self::$service(r) => &r.response_header,)*
                }
            }
        }

        $(
            impl ServiceRequest for $request {
                type Response = $response;

                const SERVICE: &'static str = stringify!($service);

                fn into_message(self) -> RequestMessage {
                    RequestMessage::$service(self)
                }

                fn response_from(message: ResponseMessage) -> UaResult<$response> {
                    match message {
                        ResponseMessage::$service(response) => Ok(response),
                        other => Err(UaError::transport(TransportError::unexpected_response(
                            stringify!($service),
                            other.service_name(),
                        ))),
                    }
                }
            }

            impl From<$response> for ResponseMessage {
                fn from(response: $response) -> Self {
                    Self::$service(response)
                }
            }
        )*
    };
}

services! {
    CreateSession => CreateSessionRequest, CreateSessionResponse;
    ActivateSession => ActivateSessionRequest, ActivateSessionResponse;
    CloseSession => CloseSessionRequest, CloseSessionResponse;
    Read => ReadRequest, ReadResponse;
    Write => WriteRequest, WriteResponse;
    CreateSubscription => CreateSubscriptionRequest, CreateSubscriptionResponse;
    ModifySubscription => ModifySubscriptionRequest, ModifySubscriptionResponse;
    SetPublishingMode => SetPublishingModeRequest, SetPublishingModeResponse;
    DeleteSubscriptions => DeleteSubscriptionsRequest, DeleteSubscriptionsResponse;
    CreateMonitoredItems => CreateMonitoredItemsRequest, CreateMonitoredItemsResponse;
    DeleteMonitoredItems => DeleteMonitoredItemsRequest, DeleteMonitoredItemsResponse;
    Publish => PublishRequest, PublishResponse;
    Republish => RepublishRequest, RepublishResponse;
}

// =============================================================================
// Tests
// =============================================================================
